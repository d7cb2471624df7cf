use crate::editor::RubricEditor;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Stored rubric row
/// `content` holds the serialized bracket table + note (see codec)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rubric {
    pub id: i64,
    pub name: String,
    pub content: String,
    pub total_score: i64,
    pub created_by: String,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
}

/// Values for a rubric about to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRubric {
    pub name: String,
    pub content: String,
    pub total_score: i64,
    pub created_by: String,
}

impl NewRubric {
    pub fn new(name: &str, content: &str, total_score: i64, created_by: &str) -> Self {
        NewRubric {
            name: name.to_string(),
            content: content.to_string(),
            total_score,
            created_by: created_by.to_string(),
        }
    }
}

// ============================================================================
// AUDIT TRAIL
// ============================================================================

/// Rubric event for the audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub rubric_id: i64,
    pub data: serde_json::Value,
    pub actor: String,
}

impl RubricEvent {
    pub fn new(event_type: &str, rubric_id: i64, data: serde_json::Value, actor: &str) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            rubric_id,
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery (in-memory databases report "memory")
    let mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!("journal_mode = {}", mode);

    conn.execute(
        "CREATE TABLE IF NOT EXISTS rubrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            content TEXT NOT NULL,
            total_score INTEGER NOT NULL CHECK (total_score >= 1),
            created_by TEXT NOT NULL,
            is_archived INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            archived_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS rubric_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            rubric_id INTEGER NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_rubrics_archived ON rubrics(is_archived, created_at)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_rubric_events_rubric ON rubric_events(rubric_id, timestamp)",
        [],
    )?;

    Ok(())
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn rubric_from_row(row: &Row) -> rusqlite::Result<Rubric> {
    let created_at: String = row.get(6)?;
    let archived_at: Option<String> = row.get(7)?;

    Ok(Rubric {
        id: row.get(0)?,
        name: row.get(1)?,
        content: row.get(2)?,
        total_score: row.get(3)?,
        created_by: row.get(4)?,
        is_archived: row.get(5)?,
        created_at: parse_timestamp(6, &created_at)?,
        archived_at: archived_at
            .map(|s| parse_timestamp(7, &s))
            .transpose()?,
    })
}

const RUBRIC_COLUMNS: &str =
    "id, name, content, total_score, created_by, is_archived, created_at, archived_at";

pub fn insert_rubric(conn: &Connection, rubric: &NewRubric) -> Result<Rubric> {
    if rubric.total_score < 1 {
        return Err(anyhow!("Total score must be at least 1, got {}", rubric.total_score));
    }

    conn.execute(
        "INSERT INTO rubrics (name, content, total_score, created_by, is_archived, created_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        params![
            rubric.name,
            rubric.content,
            rubric.total_score,
            rubric.created_by,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("Failed to insert rubric")?;

    let id = conn.last_insert_rowid();

    insert_event(
        conn,
        &RubricEvent::new(
            "rubric_created",
            id,
            serde_json::json!({ "name": rubric.name, "total_score": rubric.total_score }),
            &rubric.created_by,
        ),
    )?;

    info!("Created rubric {} ({:?})", id, rubric.name);

    get_rubric_by_id(conn, id)?.ok_or_else(|| anyhow!("Rubric {} vanished after insert", id))
}

pub fn get_all_rubrics(conn: &Connection, include_archived: bool) -> Result<Vec<Rubric>> {
    let sql = if include_archived {
        format!("SELECT {} FROM rubrics ORDER BY created_at ASC, id ASC", RUBRIC_COLUMNS)
    } else {
        format!(
            "SELECT {} FROM rubrics WHERE is_archived = 0 ORDER BY created_at ASC, id ASC",
            RUBRIC_COLUMNS
        )
    };

    let mut stmt = conn.prepare(&sql)?;
    let rubrics = stmt
        .query_map([], rubric_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rubrics)
}

pub fn get_rubric_by_id(conn: &Connection, id: i64) -> Result<Option<Rubric>> {
    let sql = format!("SELECT {} FROM rubrics WHERE id = ?1", RUBRIC_COLUMNS);

    let rubric = conn
        .query_row(&sql, params![id], rubric_from_row)
        .optional()
        .with_context(|| format!("Failed to load rubric {}", id))?;

    Ok(rubric)
}

/// Replace a rubric with a new version.
///
/// The old row is archived rather than rewritten, so evaluations that point
/// at it keep their original scoring meaning. Returns the new row.
pub fn update_rubric(conn: &Connection, old_id: i64, rubric: &NewRubric) -> Result<Rubric> {
    let tx = conn.unchecked_transaction()?;

    let archived = archive_rubric(&tx, old_id)?;
    if !archived {
        return Err(anyhow!("Rubric {} not found or already archived", old_id));
    }

    let new_rubric = insert_rubric(&tx, rubric)?;

    insert_event(
        &tx,
        &RubricEvent::new(
            "rubric_updated",
            old_id,
            serde_json::json!({ "replaced_by": new_rubric.id }),
            &rubric.created_by,
        ),
    )?;

    tx.commit()?;

    info!("Rubric {} replaced by {}", old_id, new_rubric.id);

    Ok(new_rubric)
}

/// Hide a rubric from pickers; returns false if nothing was archived
pub fn archive_rubric(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE rubrics SET is_archived = 1, archived_at = ?1 WHERE id = ?2 AND is_archived = 0",
        params![Utc::now().to_rfc3339(), id],
    )?;

    if changed > 0 {
        insert_event(
            conn,
            &RubricEvent::new("rubric_archived", id, serde_json::json!({}), "system"),
        )?;
        info!("Archived rubric {}", id);
    }

    Ok(changed > 0)
}

pub fn delete_rubric(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute("DELETE FROM rubrics WHERE id = ?1", params![id])?;

    if changed > 0 {
        insert_event(
            conn,
            &RubricEvent::new("rubric_deleted", id, serde_json::json!({}), "system"),
        )?;
        info!("Deleted rubric {}", id);
    }

    Ok(changed > 0)
}

pub fn count_rubrics(conn: &Connection, include_archived: bool) -> Result<i64> {
    let sql = if include_archived {
        "SELECT COUNT(*) FROM rubrics"
    } else {
        "SELECT COUNT(*) FROM rubrics WHERE is_archived = 0"
    };

    let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;

    Ok(count)
}

/// Persist an editor's form once it passes the save gate.
/// With `replacing`, the old rubric is archived and a new version inserted.
pub fn save_form(
    conn: &Connection,
    editor: &RubricEditor,
    created_by: &str,
    replacing: Option<i64>,
) -> Result<Rubric> {
    let content = editor.to_content()?;
    let form = editor.form();
    let new_rubric = NewRubric::new(form.name.trim(), &content, form.total_score, created_by);

    match replacing {
        Some(old_id) => update_rubric(conn, old_id, &new_rubric),
        None => insert_rubric(conn, &new_rubric),
    }
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &RubricEvent) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO rubric_events (
            event_id, timestamp, event_type, rubric_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.rubric_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Events for one rubric, newest first
pub fn get_events_for_rubric(conn: &Connection, rubric_id: i64) -> Result<Vec<RubricEvent>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, rubric_id, data, actor
         FROM rubric_events
         WHERE rubric_id = ?1
         ORDER BY timestamp DESC, id DESC",
    )?;

    let events = stmt
        .query_map(params![rubric_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(4)?;

            Ok(RubricEvent {
                event_id: row.get(0)?,
                timestamp: parse_timestamp(1, &timestamp_str)?,
                event_type: row.get(2)?,
                rubric_id: row.get(3)?,
                data: serde_json::from_str(&data_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
                })?,
                actor: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}
