// ⚠️ Domain errors for bracket editing, rubric saving and configuration
// Storage and I/O edges use anyhow; these are the errors callers match on.

use crate::bracket::ScoreRange;
use thiserror::Error;

/// Why a single bracket was rejected by the add/edit form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BracketError {
    #[error("All fields are required")]
    MissingFields,

    #[error("Scores must be valid numbers")]
    NotANumber,

    #[error("Scores must be between 0 and {total}")]
    OutOfRange { total: i64 },

    #[error("Minimum score cannot be greater than maximum score")]
    MinAboveMax,

    /// Carries the existing range that collided with the candidate
    #[error("This score range overlaps with an existing bracket ({range})")]
    Overlap { range: ScoreRange },

    #[error("Unsupported column: {0}")]
    UnknownColumn(String),

    #[error("No bracket with id {0}")]
    NotFound(String),
}

/// Why a rubric form cannot be persisted yet
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    #[error("Please enter a rubric name")]
    EmptyName,

    #[error("Please enter a valid total score")]
    InvalidTotalScore,

    /// Stored or hand-edited content can hold brackets the form would reject
    #[error("Score bracket {range} must lie within 0-{total} with min not above max")]
    BracketOutOfRange { range: ScoreRange, total: i64 },

    #[error("Score brackets overlap each other")]
    Overlapping,

    #[error("Please add score brackets to cover all ranges. Missing: {missing}")]
    IncompleteCoverage { missing: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
