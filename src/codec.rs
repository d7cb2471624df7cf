// 📝 Bracket ↔ Markdown Codec
// Rubrics persist their bracket set as a two-column Markdown table in the
// `content` column. This module writes that table and reads it back,
// tolerating hand-edited and legacy content.
//
// Format written:
//
//   Scoring Rubric:
//
//   | **Score Range** | **Criteria** |
//   | --------------- | ------------ |
//   | **0-4** | Off topic |
//   | **5** | Partially correct |
//
//
//   Note:
//   <note, verbatim>

use crate::bracket::ScoreBracket;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const TITLE_LINE: &str = "Scoring Rubric:";
pub const TABLE_HEADER: &str = "| **Score Range** | **Criteria** |";
pub const TABLE_SEPARATOR: &str = "| --------------- | ------------ |";
pub const NOTE_MARKER: &str = "Note:";

/// Substring that identifies the header row when reading
const HEADER_MARKER: &str = "| **Score Range** |";

// ============================================================================
// PARSED CONTENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedContent {
    /// Ids are `bracket-0`, `bracket-1`, ... in row order
    pub brackets: Vec<ScoreBracket>,
    pub note: Option<String>,
    /// Non-blank content with neither a table nor a note section
    pub unparsed: Option<String>,
}

impl ParsedContent {
    pub fn is_empty(&self) -> bool {
        self.brackets.is_empty() && self.note.is_none() && self.unparsed.is_none()
    }
}

// ============================================================================
// SERIALIZE
// ============================================================================

/// Render brackets (sorted by min score) and an optional note as rubric content.
///
/// No validation happens here. Criteria are written verbatim; a `|` inside
/// them will split the cell when read back.
pub fn convert_brackets_to_content(brackets: &[ScoreBracket], note: Option<&str>) -> String {
    let note = note.filter(|n| !n.trim().is_empty());

    if brackets.is_empty() {
        return match note {
            Some(note) => format!("{}\n{}", NOTE_MARKER, note),
            None => String::new(),
        };
    }

    let mut sorted: Vec<&ScoreBracket> = brackets.iter().collect();
    sorted.sort_by_key(|b| b.min_score);

    let mut content = String::new();
    content.push_str(TITLE_LINE);
    content.push_str("\n\n");
    content.push_str(TABLE_HEADER);
    content.push('\n');
    content.push_str(TABLE_SEPARATOR);
    content.push('\n');

    for bracket in sorted {
        content.push_str(&format!("| **{}** | {} |\n", bracket.range_label(), bracket.criteria));
    }

    if let Some(note) = note {
        content.push_str("\n\n");
        content.push_str(NOTE_MARKER);
        content.push('\n');
        content.push_str(note);
    }

    content
}

// ============================================================================
// PARSE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Preamble,
    Table,
    AfterTable,
}

/// Read rubric content back into brackets and a note. Total over any input.
pub fn parse_content_to_brackets(content: &str) -> ParsedContent {
    let mut brackets: Vec<ScoreBracket> = Vec::new();
    let mut state = ScanState::Preamble;
    let mut saw_header = false;
    let mut note_section: Option<&str> = None;
    let mut trailing_start: Option<usize> = None;
    let mut offset = 0;

    for line in content.split('\n') {
        let next_offset = (offset + line.len() + 1).min(content.len());

        if is_note_marker(line) {
            // Everything after the marker line belongs to the note, verbatim
            note_section = Some(&content[next_offset..]);
            break;
        }

        match state {
            ScanState::Preamble => {
                if line.contains(HEADER_MARKER) {
                    saw_header = true;
                    state = ScanState::Table;
                }
            }
            ScanState::Table => {
                let row = line.trim_start();
                if !row.starts_with('|') {
                    state = ScanState::AfterTable;
                    trailing_start = Some(offset);
                } else if row.contains("**") {
                    match parse_row(row) {
                        Some((min_score, max_score, criteria)) => {
                            let id = format!("bracket-{}", brackets.len());
                            brackets.push(ScoreBracket::new(id, min_score, max_score, criteria));
                        }
                        None => debug!("Skipping malformed rubric row: {:?}", row),
                    }
                }
            }
            ScanState::AfterTable => {}
        }

        offset = next_offset;
    }

    let note = match note_section {
        Some(section) if !section.trim().is_empty() => Some(section.to_string()),
        Some(_) => None,
        None => trailing_start
            .map(|start| content[start..].trim())
            .filter(|rest| !rest.is_empty())
            .map(str::to_string),
    };

    let unparsed = if !saw_header && note_section.is_none() && !content.trim().is_empty() {
        debug!("Rubric content has no score table ({} bytes)", content.len());
        Some(content.trim().to_string())
    } else {
        None
    };

    ParsedContent {
        brackets,
        note,
        unparsed,
    }
}

fn is_note_marker(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(NOTE_MARKER)
}

/// `| **0-4** | criteria |` → (0, 4, "criteria")
fn parse_row(row: &str) -> Option<(i64, i64, String)> {
    let cells: Vec<&str> = row
        .split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .collect();

    if cells.len() < 2 {
        return None;
    }

    let range = cells[0].replace("**", "");
    let range = range.trim();

    let (min_score, max_score) = match range.split_once('-') {
        Some((min, max)) => (parse_int_prefix(min), parse_int_prefix(max)),
        None => {
            let value = parse_int_prefix(range);
            (value, value)
        }
    };

    Some((min_score?, max_score?, cells[1].to_string()))
}

/// Leading integer of a string: optional sign then digits, rest ignored.
/// "4pts" → 4, " 12" → 12, "abc" → None.
fn parse_int_prefix(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let mut end = 0;

    for (i, c) in text.char_indices() {
        if (c == '-' || c == '+') && i == 0 {
            end = c.len_utf8();
            continue;
        }
        if c.is_ascii_digit() {
            end = i + 1;
        } else {
            break;
        }
    }

    let number = &text[..end];
    if !number.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    number.parse::<i64>().ok()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bracket(min: i64, max: i64, criteria: &str) -> ScoreBracket {
        ScoreBracket::new(format!("b{}", min), min, max, criteria)
    }

    fn tuples(brackets: &[ScoreBracket]) -> Vec<(i64, i64, String)> {
        brackets
            .iter()
            .map(|b| (b.min_score, b.max_score, b.criteria.clone()))
            .collect()
    }

    #[test]
    fn test_serialize_exact_format() {
        let brackets = vec![
            bracket(5, 9, "Mostly correct"),
            bracket(0, 4, "Off topic"),
            bracket(10, 10, "Perfect"),
        ];

        let content = convert_brackets_to_content(&brackets, Some("Be generous."));

        let expected = "Scoring Rubric:\n\n\
            | **Score Range** | **Criteria** |\n\
            | --------------- | ------------ |\n\
            | **0-4** | Off topic |\n\
            | **5-9** | Mostly correct |\n\
            | **10** | Perfect |\n\
            \n\nNote:\nBe generous.";

        assert_eq!(content, expected);
    }

    #[test]
    fn test_round_trip_with_note() {
        let brackets = vec![
            bracket(0, 4, "Off topic"),
            bracket(5, 7, "Partially correct"),
            bracket(8, 10, "Complete and well argued"),
        ];
        let note = "Deduct a point for spelling.\n\nIgnore formatting.";

        let parsed = parse_content_to_brackets(&convert_brackets_to_content(&brackets, Some(note)));

        assert_eq!(tuples(&parsed.brackets), tuples(&brackets));
        assert_eq!(parsed.note.as_deref(), Some(note));
        assert_eq!(parsed.unparsed, None);
    }

    #[test]
    fn test_round_trip_sorts_rows() {
        let brackets = vec![bracket(6, 10, "High"), bracket(0, 5, "Low")];

        let parsed = parse_content_to_brackets(&convert_brackets_to_content(&brackets, None));

        assert_eq!(
            tuples(&parsed.brackets),
            vec![(0, 5, "Low".to_string()), (6, 10, "High".to_string())]
        );
        assert_eq!(parsed.note, None);
    }

    #[test]
    fn test_round_trip_note_containing_marker() {
        let brackets = vec![bracket(0, 1, "Any")];
        let note = "First line\nNote:\n| **3** | not a row |";

        let parsed = parse_content_to_brackets(&convert_brackets_to_content(&brackets, Some(note)));

        assert_eq!(parsed.brackets.len(), 1);
        assert_eq!(parsed.note.as_deref(), Some(note));
    }

    #[test]
    fn test_ids_regenerated_in_row_order() {
        let brackets = vec![bracket(0, 4, "A"), bracket(5, 10, "B")];

        let parsed = parse_content_to_brackets(&convert_brackets_to_content(&brackets, None));

        let ids: Vec<&str> = parsed.brackets.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["bracket-0", "bracket-1"]);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(convert_brackets_to_content(&[], None), "");
        assert_eq!(convert_brackets_to_content(&[], Some("   ")), "");

        let parsed = parse_content_to_brackets("");
        assert!(parsed.brackets.is_empty());
        assert_eq!(parsed.note, None);
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_note_without_brackets() {
        let content = convert_brackets_to_content(&[], Some("Draft rubric"));
        assert_eq!(content, "Note:\nDraft rubric");

        let parsed = parse_content_to_brackets(&content);
        assert!(parsed.brackets.is_empty());
        assert_eq!(parsed.note.as_deref(), Some("Draft rubric"));
        assert_eq!(parsed.unparsed, None);
    }

    #[test]
    fn test_single_point_bracket() {
        let content = convert_brackets_to_content(&[bracket(7, 7, "Exactly right")], None);
        assert!(content.contains("| **7** | Exactly right |"));

        let parsed = parse_content_to_brackets(&content);
        assert_eq!(parsed.brackets[0].min_score, 7);
        assert_eq!(parsed.brackets[0].max_score, 7);
    }

    #[test]
    fn test_parse_hand_edited_table() {
        let content = "My rubric\n\
            |   **Score Range**   | **Criteria** |\n\
            |---|---|\n\
            |  ** 0 - 3 **  |   Weak   |\n\
            | **4pts-6** | Fair |\n\
            | **abc** | Ignored row |\n\
            | **7-** | Missing max |\n\
            | **8-10** | Strong |";

        let parsed = parse_content_to_brackets(content);

        // "|   **Score Range**" does not contain the exact header marker
        assert!(parsed.brackets.is_empty());
        assert_eq!(parsed.unparsed.as_deref(), Some(content.trim()));

        let content = content.replace("|   **Score Range**   |", "| **Score Range** |");
        let parsed = parse_content_to_brackets(&content);

        assert_eq!(
            tuples(&parsed.brackets),
            vec![
                (0, 3, "Weak".to_string()),
                (4, 6, "Fair".to_string()),
                (8, 10, "Strong".to_string()),
            ]
        );
        assert_eq!(parsed.brackets[2].id, "bracket-2");
        assert_eq!(parsed.unparsed, None);
    }

    #[test]
    fn test_parse_crlf_content() {
        let content = "Scoring Rubric:\r\n\r\n\
            | **Score Range** | **Criteria** |\r\n\
            | --------------- | ------------ |\r\n\
            | **0-5** | Low |\r\n\
            | **6-10** | High |\r\n\
            \r\n\r\nNote:\r\nBe kind.";

        let parsed = parse_content_to_brackets(content);

        assert_eq!(
            tuples(&parsed.brackets),
            vec![(0, 5, "Low".to_string()), (6, 10, "High".to_string())]
        );
        assert_eq!(parsed.note.as_deref(), Some("Be kind."));
    }

    #[test]
    fn test_trailing_text_without_marker_becomes_note() {
        let content = "| **Score Range** | **Criteria** |\n\
            | --- | --- |\n\
            | **0-10** | Anything |\n\
            \n\
            Remember to check citations.\n";

        let parsed = parse_content_to_brackets(content);

        assert_eq!(parsed.brackets.len(), 1);
        assert_eq!(parsed.note.as_deref(), Some("Remember to check citations."));
    }

    #[test]
    fn test_legacy_free_text_is_surfaced() {
        let content = "  Give 10 points for a complete answer, 5 for partial.  \n";

        let parsed = parse_content_to_brackets(content);

        assert!(parsed.brackets.is_empty());
        assert_eq!(parsed.note, None);
        assert_eq!(
            parsed.unparsed.as_deref(),
            Some("Give 10 points for a complete answer, 5 for partial.")
        );
    }

    #[test]
    fn test_garbage_never_panics() {
        let inputs = [
            "|",
            "||||",
            "| **Score Range** |",
            "| **Score Range** |\n| ** | |",
            "| **Score Range** |\n| **-** | x |",
            "| **Score Range** |\n| **99999999999999999999** | overflow |",
            "Note:",
            "note:\n",
            "\n\n\n",
            "| **Score Range** |\n| **1-2** | ünïcödé ✓ |\nNOTE:\n   ",
        ];

        for input in inputs {
            let parsed = parse_content_to_brackets(input);
            assert!(parsed.brackets.len() <= 1, "input {:?}", input);
        }

        let parsed = parse_content_to_brackets("| **Score Range** |\n| **1-2** | ünïcödé ✓ |\nNOTE:\n   ");
        assert_eq!(tuples(&parsed.brackets), vec![(1, 2, "ünïcödé ✓".to_string())]);
        assert_eq!(parsed.note, None);
    }

    #[test]
    fn test_pipe_in_criteria_truncates_cell() {
        // Unescaped format: the text after a pipe is lost on read
        let content = convert_brackets_to_content(&[bracket(0, 10, "Good | Great")], None);

        let parsed = parse_content_to_brackets(&content);

        assert_eq!(parsed.brackets[0].criteria, "Good");
    }

    #[test]
    fn test_parse_int_prefix() {
        assert_eq!(parse_int_prefix("42"), Some(42));
        assert_eq!(parse_int_prefix("  7 "), Some(7));
        assert_eq!(parse_int_prefix("4pts"), Some(4));
        assert_eq!(parse_int_prefix("+3"), Some(3));
        assert_eq!(parse_int_prefix("-3"), Some(-3));
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("-"), None);
        assert_eq!(parse_int_prefix("x1"), None);
    }
}
