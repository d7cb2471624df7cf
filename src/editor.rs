// ✏️ Rubric Editor - authoring state for one rubric
//
// Holds the in-memory RubricForm while brackets are added, edited and
// removed. Every bracket change goes through the same form validation,
// and saving is gated on full, non-overlapping coverage.

use crate::bracket::{RubricForm, ScoreBracket, ScoreRange};
use crate::codec::{convert_brackets_to_content, parse_content_to_brackets, ParsedContent};
use crate::coverage::{
    available_ranges, coverage_percentage, progress_width, validate_complete_coverage,
    validate_no_overlaps, CoverageReport,
};
use crate::db::Rubric;
use crate::error::{BracketError, SaveError};
use std::str::FromStr;

// ============================================================================
// BRACKET DRAFT
// ============================================================================

/// Raw text of the add/edit bracket form fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BracketDraft {
    pub min_score: String,
    pub max_score: String,
    pub criteria: String,
}

impl BracketDraft {
    pub fn new(min_score: impl Into<String>, max_score: impl Into<String>, criteria: impl Into<String>) -> Self {
        BracketDraft {
            min_score: min_score.into(),
            max_score: max_score.into(),
            criteria: criteria.into(),
        }
    }

    /// Prefill from an existing bracket (edit mode)
    pub fn from_bracket(bracket: &ScoreBracket) -> Self {
        BracketDraft {
            min_score: bracket.min_score.to_string(),
            max_score: bracket.max_score.to_string(),
            criteria: bracket.criteria.clone(),
        }
    }
}

/// Validate one bracket against the rubric's total and its siblings.
///
/// Checks run in form order and the first failure is returned:
/// required fields, numeric, within [0, total], min <= max, no overlap with
/// any bracket other than `editing_id`. Returns (min, max, trimmed criteria).
pub fn validate_draft(
    draft: &BracketDraft,
    total_score: i64,
    existing: &[ScoreBracket],
    editing_id: Option<&str>,
) -> Result<(i64, i64, String), BracketError> {
    let min_text = draft.min_score.trim();
    let max_text = draft.max_score.trim();
    let criteria = draft.criteria.trim();

    if min_text.is_empty() || max_text.is_empty() || criteria.is_empty() {
        return Err(BracketError::MissingFields);
    }

    let (min_score, max_score) = match (min_text.parse::<i64>(), max_text.parse::<i64>()) {
        (Ok(min), Ok(max)) => (min, max),
        _ => return Err(BracketError::NotANumber),
    };

    if min_score < 0 || max_score < 0 || min_score > total_score || max_score > total_score {
        return Err(BracketError::OutOfRange { total: total_score });
    }

    if min_score > max_score {
        return Err(BracketError::MinAboveMax);
    }

    let candidate = ScoreRange::new(min_score, max_score);
    if let Some(hit) = existing
        .iter()
        .filter(|b| Some(b.id.as_str()) != editing_id)
        .find(|b| b.range().overlaps(&candidate))
    {
        return Err(BracketError::Overlap { range: hit.range() });
    }

    Ok((min_score, max_score, criteria.to_string()))
}

// ============================================================================
// COLUMN EDIT COMMANDS
// ============================================================================

/// Editable columns of the bracket table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketColumn {
    MinScore,
    MaxScore,
    Criteria,
}

impl BracketColumn {
    pub fn key(&self) -> &'static str {
        match self {
            BracketColumn::MinScore => "minScore",
            BracketColumn::MaxScore => "maxScore",
            BracketColumn::Criteria => "criteria",
        }
    }
}

impl FromStr for BracketColumn {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minScore" | "min_score" => Ok(BracketColumn::MinScore),
            "maxScore" | "max_score" => Ok(BracketColumn::MaxScore),
            "criteria" => Ok(BracketColumn::Criteria),
            other => Err(BracketError::UnknownColumn(other.to_string())),
        }
    }
}

/// A single-cell edit against one bracket row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BracketEdit {
    MinScore(i64),
    MaxScore(i64),
    Criteria(String),
}

impl BracketEdit {
    /// Build an edit from a raw column id and cell text
    pub fn parse(column: &str, value: &str) -> Result<Self, BracketError> {
        let column: BracketColumn = column.parse()?;

        match column {
            BracketColumn::MinScore => value
                .trim()
                .parse()
                .map(BracketEdit::MinScore)
                .map_err(|_| BracketError::NotANumber),
            BracketColumn::MaxScore => value
                .trim()
                .parse()
                .map(BracketEdit::MaxScore)
                .map_err(|_| BracketError::NotANumber),
            BracketColumn::Criteria => Ok(BracketEdit::Criteria(value.to_string())),
        }
    }

    pub fn column(&self) -> BracketColumn {
        match self {
            BracketEdit::MinScore(_) => BracketColumn::MinScore,
            BracketEdit::MaxScore(_) => BracketColumn::MaxScore,
            BracketEdit::Criteria(_) => BracketColumn::Criteria,
        }
    }

    fn apply_to(&self, draft: &mut BracketDraft) {
        match self {
            BracketEdit::MinScore(v) => draft.min_score = v.to_string(),
            BracketEdit::MaxScore(v) => draft.max_score = v.to_string(),
            BracketEdit::Criteria(text) => draft.criteria = text.clone(),
        }
    }
}

// ============================================================================
// RUBRIC EDITOR
// ============================================================================

#[derive(Debug, Clone)]
pub struct RubricEditor {
    form: RubricForm,
    original: RubricForm,
    next_id: usize,
    /// Legacy free text the stored content held instead of a table
    unparsed: Option<String>,
}

impl RubricEditor {
    /// Start a blank rubric
    pub fn new(name: impl Into<String>, total_score: i64) -> Self {
        let form = RubricForm::new(name, total_score);
        RubricEditor {
            original: form.clone(),
            form,
            next_id: 0,
            unparsed: None,
        }
    }

    /// Start from stored content (edit mode)
    pub fn from_content(name: impl Into<String>, total_score: i64, content: &str) -> Self {
        Self::from_parsed(name, total_score, parse_content_to_brackets(content))
    }

    /// Start from content the caller has already parsed
    pub fn from_parsed(name: impl Into<String>, total_score: i64, parsed: ParsedContent) -> Self {
        let next_id = parsed.brackets.len();

        let form = RubricForm {
            name: name.into(),
            total_score,
            brackets: parsed.brackets,
            note: parsed.note,
        };

        RubricEditor {
            original: form.clone(),
            form,
            next_id,
            unparsed: parsed.unparsed,
        }
    }

    pub fn from_rubric(rubric: &Rubric) -> Self {
        Self::from_content(rubric.name.clone(), rubric.total_score, &rubric.content)
    }

    pub fn form(&self) -> &RubricForm {
        &self.form
    }

    pub fn brackets(&self) -> &[ScoreBracket] {
        &self.form.brackets
    }

    pub fn unparsed(&self) -> Option<&str> {
        self.unparsed.as_deref()
    }

    /// Brackets in display order
    pub fn sorted_brackets(&self) -> Vec<&ScoreBracket> {
        let mut sorted: Vec<&ScoreBracket> = self.form.brackets.iter().collect();
        sorted.sort_by_key(|b| b.min_score);
        sorted
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.form.name = name.into();
    }

    pub fn set_total_score(&mut self, total_score: i64) {
        self.form.total_score = total_score;
    }

    pub fn set_note(&mut self, note: Option<String>) {
        self.form.note = note.filter(|n| !n.trim().is_empty());
    }

    fn generate_id(&mut self) -> String {
        loop {
            let id = format!("bracket-{}", self.next_id);
            self.next_id += 1;
            if self.form.find(&id).is_none() {
                return id;
            }
        }
    }

    pub fn add_bracket(&mut self, draft: &BracketDraft) -> Result<&ScoreBracket, BracketError> {
        let (min_score, max_score, criteria) =
            validate_draft(draft, self.form.total_score, &self.form.brackets, None)?;

        let id = self.generate_id();
        self.form.brackets.push(ScoreBracket::new(id, min_score, max_score, criteria));

        let last = self.form.brackets.len() - 1;
        Ok(&self.form.brackets[last])
    }

    pub fn edit_bracket(&mut self, id: &str, draft: &BracketDraft) -> Result<&ScoreBracket, BracketError> {
        let index = self
            .form
            .brackets
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| BracketError::NotFound(id.to_string()))?;

        let (min_score, max_score, criteria) =
            validate_draft(draft, self.form.total_score, &self.form.brackets, Some(id))?;

        let bracket = &mut self.form.brackets[index];
        bracket.min_score = min_score;
        bracket.max_score = max_score;
        bracket.criteria = criteria;

        Ok(&self.form.brackets[index])
    }

    /// Apply a single-cell edit, validated exactly like the edit form
    pub fn apply_edit(&mut self, id: &str, edit: &BracketEdit) -> Result<&ScoreBracket, BracketError> {
        let current = self
            .form
            .find(id)
            .ok_or_else(|| BracketError::NotFound(id.to_string()))?;

        let mut draft = BracketDraft::from_bracket(current);
        edit.apply_to(&mut draft);

        self.edit_bracket(id, &draft)
    }

    pub fn delete_bracket(&mut self, id: &str) -> bool {
        let before = self.form.brackets.len();
        self.form.brackets.retain(|b| b.id != id);
        self.form.brackets.len() != before
    }

    pub fn coverage(&self) -> CoverageReport {
        validate_complete_coverage(&self.form.brackets, self.form.total_score)
    }

    pub fn coverage_percentage(&self) -> i64 {
        coverage_percentage(&self.form.brackets, self.form.total_score)
    }

    pub fn progress_width(&self) -> u16 {
        progress_width(self.coverage_percentage())
    }

    pub fn available_ranges(&self, excluding_id: Option<&str>) -> Vec<ScoreRange> {
        available_ranges(&self.form.brackets, self.form.total_score, excluding_id)
    }

    /// Bracket order and ids are ignored; only values are compared
    pub fn is_modified(&self) -> bool {
        fn values(form: &RubricForm) -> Vec<(i64, i64, &str)> {
            let mut values: Vec<_> = form.brackets.iter().map(|b| b.value_key()).collect();
            values.sort();
            values
        }

        self.form.name != self.original.name
            || self.form.total_score != self.original.total_score
            || self.form.note != self.original.note
            || values(&self.form) != values(&self.original)
    }

    pub fn check_save(&self) -> Result<(), SaveError> {
        if self.form.name.trim().is_empty() {
            return Err(SaveError::EmptyName);
        }

        if self.form.total_score <= 0 {
            return Err(SaveError::InvalidTotalScore);
        }

        let total_score = self.form.total_score;
        if let Some(bad) = self.sorted_brackets().into_iter().find(|b| {
            b.min_score < 0 || b.max_score > total_score || b.min_score > b.max_score
        }) {
            return Err(SaveError::BracketOutOfRange {
                range: bad.range(),
                total: total_score,
            });
        }

        if !validate_no_overlaps(&self.form.brackets) {
            return Err(SaveError::Overlapping);
        }

        let coverage = self.coverage();
        if !coverage.is_valid {
            return Err(SaveError::IncompleteCoverage {
                missing: coverage.missing_summary(),
            });
        }

        Ok(())
    }

    pub fn can_save(&self) -> bool {
        self.check_save().is_ok()
    }

    /// Serialized content, only once the form passes the save gate
    pub fn to_content(&self) -> Result<String, SaveError> {
        self.check_save()?;
        Ok(convert_brackets_to_content(&self.form.brackets, self.form.note.as_deref()))
    }

    /// Accept the current state as the new baseline (after a successful save)
    pub fn mark_saved(&mut self) {
        self.original = self.form.clone();
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn editor_with(ranges: &[(i64, i64)]) -> RubricEditor {
        let mut editor = RubricEditor::new("Essay", 10);
        for (min, max) in ranges {
            editor
                .add_bracket(&BracketDraft::new(min.to_string(), max.to_string(), "criteria"))
                .unwrap();
        }
        editor
    }

    #[test]
    fn test_validate_draft_order_of_checks() {
        let existing = vec![ScoreBracket::new("a", 0, 4, "Low")];

        let cases = [
            (BracketDraft::new("", "4", "x"), BracketError::MissingFields),
            (BracketDraft::new("1", "2", "   "), BracketError::MissingFields),
            (BracketDraft::new("one", "2", "x"), BracketError::NotANumber),
            (BracketDraft::new("5", "11", "x"), BracketError::OutOfRange { total: 10 }),
            (BracketDraft::new("-1", "3", "x"), BracketError::OutOfRange { total: 10 }),
            (BracketDraft::new("8", "6", "x"), BracketError::MinAboveMax),
            (
                BracketDraft::new("4", "6", "x"),
                BracketError::Overlap { range: ScoreRange::new(0, 4) },
            ),
        ];

        for (draft, expected) in cases {
            assert_eq!(validate_draft(&draft, 10, &existing, None), Err(expected));
        }
    }

    #[test]
    fn test_validate_draft_trims_criteria() {
        let result = validate_draft(&BracketDraft::new(" 5 ", "10", "  Strong answer  "), 10, &[], None);
        assert_eq!(result, Ok((5, 10, "Strong answer".to_string())));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(BracketError::MissingFields.to_string(), "All fields are required");
        assert_eq!(
            BracketError::OutOfRange { total: 10 }.to_string(),
            "Scores must be between 0 and 10"
        );
        assert_eq!(
            SaveError::IncompleteCoverage { missing: "5, 8-10".to_string() }.to_string(),
            "Please add score brackets to cover all ranges. Missing: 5, 8-10"
        );
    }

    #[test]
    fn test_add_rejects_overlap_edit_allows_self() {
        let mut editor = editor_with(&[(0, 4), (5, 10)]);

        let err = editor.add_bracket(&BracketDraft::new("3", "6", "x")).unwrap_err();
        assert!(matches!(err, BracketError::Overlap { .. }));

        // An edited bracket is only checked against the others
        let edited = editor
            .edit_bracket("bracket-0", &BracketDraft::new("0", "3", "Narrower"))
            .unwrap();
        assert_eq!(edited.range(), ScoreRange::new(0, 3));

        // ...but not into a neighbour
        let err = editor
            .edit_bracket("bracket-0", &BracketDraft::new("0", "5", "Too wide"))
            .unwrap_err();
        assert_eq!(err, BracketError::Overlap { range: ScoreRange::new(5, 10) });
    }

    #[test]
    fn test_edit_unknown_bracket() {
        let mut editor = editor_with(&[(0, 10)]);
        let err = editor
            .edit_bracket("nope", &BracketDraft::new("0", "1", "x"))
            .unwrap_err();
        assert_eq!(err, BracketError::NotFound("nope".to_string()));
    }

    #[test]
    fn test_delete_bracket_opens_gap() {
        let mut editor = editor_with(&[(0, 4), (5, 7), (8, 10)]);
        assert!(editor.coverage().is_valid);

        assert!(editor.delete_bracket("bracket-1"));
        assert!(!editor.delete_bracket("bracket-1"));

        let coverage = editor.coverage();
        assert_eq!(coverage.missing_ranges, vec![ScoreRange::new(5, 7)]);
        assert_eq!(editor.available_ranges(None), vec![ScoreRange::new(5, 7)]);
    }

    #[test]
    fn test_generated_ids_skip_parsed_ids() {
        let content = convert_brackets_to_content(
            &[ScoreBracket::new("x", 0, 4, "Low"), ScoreBracket::new("y", 6, 10, "High")],
            None,
        );
        let mut editor = RubricEditor::from_content("Essay", 10, &content);

        let added = editor.add_bracket(&BracketDraft::new("5", "5", "Middle")).unwrap();
        assert_eq!(added.id, "bracket-2");
        assert!(editor.can_save());
    }

    #[test]
    fn test_column_edit_commands() {
        assert_eq!(BracketEdit::parse("minScore", " 3 "), Ok(BracketEdit::MinScore(3)));
        assert_eq!(BracketEdit::parse("max_score", "9"), Ok(BracketEdit::MaxScore(9)));
        assert_eq!(
            BracketEdit::parse("criteria", "Fine"),
            Ok(BracketEdit::Criteria("Fine".to_string()))
        );
        assert_eq!(BracketEdit::parse("maxScore", "nine"), Err(BracketError::NotANumber));
        assert_eq!(
            BracketEdit::parse("weight", "1"),
            Err(BracketError::UnknownColumn("weight".to_string()))
        );
        assert_eq!(BracketEdit::MinScore(1).column().key(), "minScore");
    }

    #[test]
    fn test_apply_edit_is_validated() {
        let mut editor = editor_with(&[(0, 4), (5, 10)]);

        let edited = editor
            .apply_edit("bracket-1", &BracketEdit::Criteria("Excellent".to_string()))
            .unwrap();
        assert_eq!(edited.criteria, "Excellent");

        let err = editor
            .apply_edit("bracket-1", &BracketEdit::MinScore(4))
            .unwrap_err();
        assert!(matches!(err, BracketError::Overlap { .. }));
        assert_eq!(editor.form().find("bracket-1").unwrap().min_score, 5);

        let err = editor
            .apply_edit("bracket-1", &BracketEdit::MaxScore(11))
            .unwrap_err();
        assert_eq!(err, BracketError::OutOfRange { total: 10 });
    }

    #[test]
    fn test_save_gate() {
        let mut editor = editor_with(&[(0, 4)]);
        assert_eq!(
            editor.to_content(),
            Err(SaveError::IncompleteCoverage { missing: "5-10".to_string() })
        );

        editor.add_bracket(&BracketDraft::new("5", "10", "High")).unwrap();
        assert!(editor.to_content().is_ok());

        editor.set_name("  ");
        assert_eq!(editor.check_save(), Err(SaveError::EmptyName));

        editor.set_name("Essay");
        editor.set_total_score(0);
        assert_eq!(editor.check_save(), Err(SaveError::InvalidTotalScore));
    }

    #[test]
    fn test_save_gate_rejects_overlap_from_stored_content() {
        // Stored content is not form-validated, so overlap can arrive via parse
        let content = "| **Score Range** | **Criteria** |\n\
            | **0-6** | Low |\n\
            | **5-10** | High |";
        let editor = RubricEditor::from_content("Essay", 10, content);

        assert!(editor.coverage().is_valid);
        assert_eq!(editor.check_save(), Err(SaveError::Overlapping));
        assert_eq!(editor.coverage_percentage(), 118);
        assert_eq!(editor.progress_width(), 99);
    }

    #[test]
    fn test_save_gate_rejects_out_of_range_stored_brackets() {
        let past_total = RubricEditor::from_content(
            "Essay",
            10,
            "| **Score Range** | **Criteria** |\n| **0-15** | Anything |",
        );
        assert!(past_total.coverage().is_valid);
        assert_eq!(
            past_total.check_save(),
            Err(SaveError::BracketOutOfRange { range: ScoreRange::new(0, 15), total: 10 })
        );

        let inverted = RubricEditor::from_content(
            "Essay",
            10,
            "| **Score Range** | **Criteria** |\n\
            | **0-5** | Low |\n\
            | **6-10** | High |\n\
            | **11-10** | Stray |",
        );
        assert!(inverted.coverage().is_valid);
        assert!(validate_no_overlaps(inverted.brackets()));
        assert_eq!(
            inverted.check_save(),
            Err(SaveError::BracketOutOfRange { range: ScoreRange::new(11, 10), total: 10 })
        );
        assert!(inverted.to_content().is_err());
    }

    #[test]
    fn test_huge_stored_bound_is_reported_not_panicking() {
        let content = "| **Score Range** | **Criteria** |\n| **0-9223372036854775807** | x |";
        let editor = RubricEditor::from_content("Essay", 10, content);

        assert_eq!(editor.brackets()[0].max_score, i64::MAX);
        assert!(editor.coverage().is_valid);
        assert!(editor.coverage_percentage() > 100);
        assert_eq!(editor.progress_width(), 99);
        assert!(editor.available_ranges(None).is_empty());
        assert_eq!(
            editor.check_save(),
            Err(SaveError::BracketOutOfRange { range: ScoreRange::new(0, i64::MAX), total: 10 })
        );
    }

    #[test]
    fn test_editor_keeps_legacy_free_text() {
        let legacy = RubricEditor::from_content("Essay", 10, "  Award full marks for a cited answer.\n");
        assert_eq!(legacy.unparsed(), Some("Award full marks for a cited answer."));
        assert!(legacy.brackets().is_empty());

        let parsed = parse_content_to_brackets("| **Score Range** | **Criteria** |\n| **0-10** | Any |");
        let tabled = RubricEditor::from_parsed("Essay", 10, parsed);
        assert_eq!(tabled.unparsed(), None);
        assert_eq!(tabled.brackets().len(), 1);
        assert!(RubricEditor::new("Essay", 10).unparsed().is_none());
    }

    #[test]
    fn test_is_modified_tracking() {
        let content = convert_brackets_to_content(
            &[ScoreBracket::new("a", 0, 4, "Low"), ScoreBracket::new("b", 5, 10, "High")],
            Some("Note text"),
        );
        let mut editor = RubricEditor::from_content("Essay", 10, &content);
        assert!(!editor.is_modified());

        editor.set_note(Some("Other".to_string()));
        assert!(editor.is_modified());

        editor.set_note(Some("Note text".to_string()));
        assert!(!editor.is_modified());

        // Same values after delete + re-add under a new id
        editor.delete_bracket("bracket-0");
        editor.add_bracket(&BracketDraft::new("0", "4", "Low")).unwrap();
        assert!(!editor.is_modified());

        editor.apply_edit("bracket-1", &BracketEdit::Criteria("Top".to_string())).unwrap();
        assert!(editor.is_modified());

        editor.mark_saved();
        assert!(!editor.is_modified());
    }

    #[test]
    fn test_to_content_round_trips_through_editor() {
        let mut editor = editor_with(&[(5, 10), (0, 4)]);
        editor.set_note(Some("Check sources".to_string()));

        let content = editor.to_content().unwrap();
        let reloaded = RubricEditor::from_content("Essay", 10, &content);

        let values: Vec<_> = reloaded.brackets().iter().map(|b| (b.min_score, b.max_score)).collect();
        assert_eq!(values, vec![(0, 4), (5, 10)]);
        assert_eq!(reloaded.form().note.as_deref(), Some("Check sources"));
        assert!(reloaded.can_save());
    }
}
