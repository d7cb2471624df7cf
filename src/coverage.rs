// 📏 Coverage Engine - Do the brackets partition [0, total_score]?
//
// Pure functions over a bracket slice. Inputs are never reordered; every
// check sorts its own copy of references (stable, so equal minimums keep
// insertion order).

use crate::bracket::{ScoreBracket, ScoreRange};
use serde::{Deserialize, Serialize};

// ============================================================================
// COVERAGE REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub is_valid: bool,
    /// Ascending by `min`
    pub missing_ranges: Vec<ScoreRange>,
}

impl CoverageReport {
    /// "5, 8-10" style listing used in save-blocking messages
    pub fn missing_summary(&self) -> String {
        self.missing_ranges
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn missing_points(&self) -> i64 {
        self.missing_ranges
            .iter()
            .fold(0i64, |acc, r| acc.saturating_add(r.len()))
    }
}

// ============================================================================
// VALIDATORS
// ============================================================================

fn sorted_by_min(brackets: &[ScoreBracket]) -> Vec<&ScoreBracket> {
    let mut sorted: Vec<&ScoreBracket> = brackets.iter().collect();
    sorted.sort_by_key(|b| b.min_score);
    sorted
}

/// False when any two brackets share at least one score
pub fn validate_no_overlaps(brackets: &[ScoreBracket]) -> bool {
    let sorted = sorted_by_min(brackets);

    sorted
        .windows(2)
        .all(|pair| pair[0].max_score < pair[1].min_score)
}

/// Report the sub-ranges of [0, total_score] no bracket reaches.
///
/// Overlaps are not detected here; two brackets both spanning the whole
/// range produce a valid report. Pair with [`validate_no_overlaps`].
pub fn validate_complete_coverage(brackets: &[ScoreBracket], total_score: i64) -> CoverageReport {
    if brackets.is_empty() {
        return CoverageReport {
            is_valid: false,
            missing_ranges: vec![ScoreRange::new(0, total_score)],
        };
    }

    let sorted = sorted_by_min(brackets);
    let mut missing_ranges = Vec::new();

    let first = sorted[0];
    if first.min_score > 0 {
        missing_ranges.push(ScoreRange::new(0, first.min_score - 1));
    }

    for pair in sorted.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        let after = current.max_score.saturating_add(1);
        if after < next.min_score {
            missing_ranges.push(ScoreRange::new(after, next.min_score - 1));
        }
    }

    let last = sorted[sorted.len() - 1];
    if last.max_score < total_score {
        missing_ranges.push(ScoreRange::new(last.max_score.saturating_add(1), total_score));
    }

    CoverageReport {
        is_valid: missing_ranges.is_empty(),
        missing_ranges,
    }
}

/// Covered share of the total_score + 1 possible scores, rounded half-up.
///
/// Overlapping regions are counted once per bracket, so the result can
/// exceed 100. Not clamped here; see [`progress_width`].
/// Summed in f64 so extreme bounds saturate instead of overflowing.
pub fn coverage_percentage(brackets: &[ScoreBracket], total_score: i64) -> i64 {
    let possible = total_score.saturating_add(1);
    if brackets.is_empty() || possible <= 0 {
        return 0;
    }

    let covered: f64 = brackets.iter().map(|b| b.point_count() as f64).sum();
    let ratio = covered / possible as f64 * 100.0;

    (ratio + 0.5).floor() as i64
}

/// Width for a coverage progress bar: over-full bars draw at 99
pub fn progress_width(percentage: i64) -> u16 {
    if percentage <= 100 {
        percentage.max(0) as u16
    } else {
        99
    }
}

/// Unfilled ranges to suggest while a bracket is being typed in.
///
/// `excluding_id` drops the bracket under edit so its own range shows as free.
pub fn available_ranges(
    brackets: &[ScoreBracket],
    total_score: i64,
    excluding_id: Option<&str>,
) -> Vec<ScoreRange> {
    let mut others: Vec<&ScoreBracket> = brackets
        .iter()
        .filter(|b| Some(b.id.as_str()) != excluding_id)
        .collect();
    others.sort_by_key(|b| b.min_score);

    let mut ranges = Vec::new();
    let mut current_min = 0;

    for bracket in others {
        if current_min < bracket.min_score {
            ranges.push(ScoreRange::new(current_min, bracket.min_score - 1));
        }
        current_min = bracket.max_score.saturating_add(1);
    }

    if current_min <= total_score {
        ranges.push(ScoreRange::new(current_min, total_score));
    }

    ranges
}

// ============================================================================
// TESTS
// ============================================================================
