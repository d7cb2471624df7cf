// 🎯 Score Brackets - the values a rubric is made of
// A bracket is a closed integer range [min_score, max_score] of the rubric's
// total score, paired with the criteria an answer must meet to land in it.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// SCORE RANGE
// ============================================================================

/// Inclusive integer range, used for missing and available ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: i64,
    pub max: i64,
}

impl ScoreRange {
    pub fn new(min: i64, max: i64) -> Self {
        ScoreRange { min, max }
    }

    /// Number of integer scores in the range, saturating at `i64::MAX`
    pub fn len(&self) -> i64 {
        self.max.saturating_sub(self.min).saturating_add(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }

    pub fn contains(&self, score: i64) -> bool {
        self.min <= score && score <= self.max
    }

    /// Both bounds are inclusive, so touching at one integer counts
    pub fn overlaps(&self, other: &ScoreRange) -> bool {
        !(self.max < other.min || self.min > other.max)
    }
}

impl fmt::Display for ScoreRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

// ============================================================================
// SCORE BRACKET
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBracket {
    /// List identity only; regenerated on every parse, never persisted
    pub id: String,
    pub min_score: i64,
    pub max_score: i64,
    pub criteria: String,
}

impl ScoreBracket {
    pub fn new(id: impl Into<String>, min_score: i64, max_score: i64, criteria: impl Into<String>) -> Self {
        ScoreBracket {
            id: id.into(),
            min_score,
            max_score,
            criteria: criteria.into(),
        }
    }

    pub fn range(&self) -> ScoreRange {
        ScoreRange::new(self.min_score, self.max_score)
    }

    pub fn point_count(&self) -> i64 {
        self.range().len()
    }

    pub fn is_single_point(&self) -> bool {
        self.min_score == self.max_score
    }

    pub fn overlaps(&self, other: &ScoreBracket) -> bool {
        self.range().overlaps(&other.range())
    }

    /// "7" for a single point, "0-4" otherwise
    pub fn range_label(&self) -> String {
        self.range().to_string()
    }

    /// Value identity that survives a save/reload cycle (ids do not)
    pub fn value_key(&self) -> (i64, i64, &str) {
        (self.min_score, self.max_score, self.criteria.as_str())
    }
}

// ============================================================================
// RUBRIC FORM
// ============================================================================

/// In-memory authoring state for one rubric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricForm {
    pub name: String,
    pub total_score: i64,
    pub brackets: Vec<ScoreBracket>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl RubricForm {
    pub fn new(name: impl Into<String>, total_score: i64) -> Self {
        RubricForm {
            name: name.into(),
            total_score,
            brackets: Vec::new(),
            note: None,
        }
    }

    pub fn find(&self, id: &str) -> Option<&ScoreBracket> {
        self.brackets.iter().find(|b| b.id == id)
    }
}

// ============================================================================
// TESTS
// ============================================================================
