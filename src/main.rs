// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use rubric_brackets::{
    archive_rubric, delete_rubric, get_all_rubrics, get_rubric_by_id, save_form, setup_database,
    validate_no_overlaps, CliOverrides, Config, CoverageReport, Rubric, RubricEditor, ScoreBracket,
};
use rusqlite::Connection;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rubric-brackets", version, about = "Author and validate score-bracket rubrics")]
struct Cli {
    /// TOML config file (overrides RUBRIC_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides RUBRIC_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Author recorded on new rubrics (overrides RUBRIC_AUTHOR)
    #[arg(long, global = true)]
    created_by: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database schema
    Init,
    /// Create a rubric from a Markdown bracket table
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        total_score: Option<i64>,
        #[arg(long)]
        from: PathBuf,
    },
    /// Replace a rubric with a new version (the old one is archived)
    Update {
        id: i64,
        #[arg(long)]
        from: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        total_score: Option<i64>,
    },
    /// List rubrics
    List {
        /// Include archived rubrics
        #[arg(long)]
        all: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show one rubric with its coverage report
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Validate a Markdown bracket table without saving it
    Check {
        file: PathBuf,
        #[arg(long)]
        total_score: Option<i64>,
    },
    /// Archive a rubric
    Archive { id: i64 },
    /// Delete a rubric permanently
    Delete { id: i64 },
    /// Browse rubrics in the terminal (default)
    Ui,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::resolve(&CliOverrides {
        config_path: cli.config.clone(),
        database_path: cli.db.clone(),
        created_by: cli.created_by.clone(),
    })?;
    debug!("Resolved config: {:?}", config);

    match cli.command.unwrap_or(Command::Ui) {
        Command::Init => run_init(&config),
        Command::Create { name, total_score, from } => {
            run_create(&config, &name, total_score.unwrap_or(config.default_total_score), &from)
        }
        Command::Update { id, from, name, total_score } => {
            run_update(&config, id, &from, name, total_score)
        }
        Command::List { all, json } => run_list(&config, all, json),
        Command::Show { id, json } => run_show(&config, id, json),
        Command::Check { file, total_score } => {
            run_check(&file, total_score.unwrap_or(config.default_total_score))
        }
        Command::Archive { id } => run_archive(&config, id),
        Command::Delete { id } => run_delete(&config, id),
        Command::Ui => run_ui_mode(&config),
    }
}

fn open_database(config: &Config) -> Result<Connection> {
    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;
    setup_database(&conn)?;
    Ok(conn)
}

fn read_markdown(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read rubric file: {:?}", path))
}

fn warn_if_unparsed(editor: &RubricEditor, path: &Path) {
    if editor.unparsed().is_some() {
        warn!("{:?} has no score table; it will be treated as free text", path);
    }
}

fn run_init(config: &Config) -> Result<()> {
    open_database(config)?;
    println!("✓ Database ready at {:?}", config.database_path);
    Ok(())
}

fn run_create(config: &Config, name: &str, total_score: i64, from: &Path) -> Result<()> {
    let content = read_markdown(from)?;
    let editor = RubricEditor::from_content(name, total_score, &content);
    warn_if_unparsed(&editor, from);
    print_coverage(&editor);

    let conn = open_database(config)?;
    let rubric = save_form(&conn, &editor, &config.created_by, None)?;

    println!("✓ Created rubric {} \"{}\"", rubric.id, rubric.name);
    Ok(())
}

fn run_update(
    config: &Config,
    id: i64,
    from: &Path,
    name: Option<String>,
    total_score: Option<i64>,
) -> Result<()> {
    let conn = open_database(config)?;
    let old = get_rubric_by_id(&conn, id)?.ok_or_else(|| anyhow!("Rubric {} not found", id))?;

    let content = read_markdown(from)?;
    let editor = RubricEditor::from_content(
        name.unwrap_or_else(|| old.name.clone()),
        total_score.unwrap_or(old.total_score),
        &content,
    );
    warn_if_unparsed(&editor, from);
    print_coverage(&editor);

    let rubric = save_form(&conn, &editor, &config.created_by, Some(old.id))?;

    println!("✓ Rubric {} archived, replaced by {} \"{}\"", old.id, rubric.id, rubric.name);
    Ok(())
}

#[derive(Serialize)]
struct RubricSummary<'a> {
    #[serde(flatten)]
    rubric: &'a Rubric,
    brackets: Vec<ScoreBracket>,
    note: Option<String>,
    unparsed: Option<String>,
    coverage: CoverageReport,
    coverage_percentage: i64,
    no_overlaps: bool,
}

impl<'a> RubricSummary<'a> {
    fn new(rubric: &'a Rubric) -> Self {
        let editor = RubricEditor::from_rubric(rubric);

        RubricSummary {
            rubric,
            coverage: editor.coverage(),
            coverage_percentage: editor.coverage_percentage(),
            no_overlaps: validate_no_overlaps(editor.brackets()),
            brackets: editor.brackets().to_vec(),
            note: editor.form().note.clone(),
            unparsed: editor.unparsed().map(str::to_string),
        }
    }
}

fn run_list(config: &Config, all: bool, json: bool) -> Result<()> {
    let conn = open_database(config)?;
    let rubrics = get_all_rubrics(&conn, all)?;

    if json {
        let summaries: Vec<RubricSummary> = rubrics.iter().map(RubricSummary::new).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if rubrics.is_empty() {
        println!("No rubrics yet. Create one with: rubric-brackets create --name <NAME> --from <FILE>");
        return Ok(());
    }

    println!("{:<6} {:<32} {:>6} {:>9} {:>9}  {}", "ID", "Name", "Total", "Brackets", "Coverage", "Status");
    for rubric in &rubrics {
        let summary = RubricSummary::new(rubric);
        let status = if rubric.is_archived {
            "archived"
        } else if summary.unparsed.is_some() {
            "legacy"
        } else if !summary.no_overlaps {
            "overlap"
        } else if summary.coverage.is_valid {
            "complete"
        } else {
            "gaps"
        };

        println!(
            "{:<6} {:<32} {:>6} {:>9} {:>8}%  {}",
            rubric.id,
            rubric.name,
            rubric.total_score,
            summary.brackets.len(),
            summary.coverage_percentage,
            status
        );
    }

    Ok(())
}

fn run_show(config: &Config, id: i64, json: bool) -> Result<()> {
    let conn = open_database(config)?;
    let rubric = get_rubric_by_id(&conn, id)?.ok_or_else(|| anyhow!("Rubric {} not found", id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&RubricSummary::new(&rubric))?);
        return Ok(());
    }

    println!("📋 {} (#{}, total {})", rubric.name, rubric.id, rubric.total_score);
    println!("   by {} on {}", rubric.created_by, rubric.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(archived_at) = rubric.archived_at {
        println!("   archived {}", archived_at.format("%Y-%m-%d %H:%M"));
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{}", rubric.content);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    print_coverage(&RubricEditor::from_rubric(&rubric));
    Ok(())
}

fn run_check(file: &Path, total_score: i64) -> Result<()> {
    let content = read_markdown(file)?;
    let editor = RubricEditor::from_content(file.display().to_string(), total_score, &content);
    warn_if_unparsed(&editor, file);

    println!("🔍 {} bracket(s) over 0-{}", editor.brackets().len(), total_score);
    for bracket in editor.sorted_brackets() {
        println!("   {:>7}  {}", bracket.range_label(), bracket.criteria);
    }
    print_coverage(&editor);

    let available = editor.available_ranges(None);
    if !available.is_empty() {
        let listing: Vec<String> = available.iter().map(|r| r.to_string()).collect();
        println!("   Available: {}", listing.join(", "));
    }

    match editor.check_save() {
        Ok(()) => {
            println!("✅ Rubric can be saved");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
}

fn run_archive(config: &Config, id: i64) -> Result<()> {
    let conn = open_database(config)?;
    if archive_rubric(&conn, id)? {
        println!("✓ Archived rubric {}", id);
    } else {
        println!("Rubric {} not found or already archived", id);
    }
    Ok(())
}

fn run_delete(config: &Config, id: i64) -> Result<()> {
    let conn = open_database(config)?;
    if delete_rubric(&conn, id)? {
        println!("✓ Deleted rubric {}", id);
    } else {
        println!("Rubric {} not found", id);
    }
    Ok(())
}

fn print_coverage(editor: &RubricEditor) {
    let coverage = editor.coverage();
    let overlap_free = validate_no_overlaps(editor.brackets());

    println!("📏 Coverage: {}%", editor.coverage_percentage());
    if coverage.is_valid {
        println!("   ✓ Every score from 0 to {} is covered", editor.form().total_score);
    } else {
        println!("   Missing: {}", coverage.missing_summary());
    }
    if !overlap_free {
        println!("   ✗ Brackets overlap");
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config) -> Result<()> {
    let conn = open_database(config)?;
    let rubrics = get_all_rubrics(&conn, false)?;

    let mut app = ui::App::new(rubrics);
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the CLI: rubric-brackets list");
    std::process::exit(1);
}
