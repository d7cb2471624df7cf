// Rubric Brackets - Core Library
// Score-bracket coverage engine, Markdown codec and rubric store,
// shared by the CLI, the TUI and tests

pub mod bracket;
pub mod codec;
pub mod config;
pub mod coverage;
pub mod db;
pub mod editor;
pub mod error;

// Re-export commonly used types
pub use bracket::{RubricForm, ScoreBracket, ScoreRange};
pub use codec::{convert_brackets_to_content, parse_content_to_brackets, ParsedContent};
pub use config::{CliOverrides, Config};
pub use coverage::{
    available_ranges, coverage_percentage, progress_width, validate_complete_coverage,
    validate_no_overlaps, CoverageReport,
};
pub use db::{
    Rubric, NewRubric, RubricEvent,
    setup_database, insert_rubric, get_all_rubrics, get_rubric_by_id,
    update_rubric, archive_rubric, delete_rubric, count_rubrics, save_form,
    insert_event, get_events_for_rubric,
};
pub use editor::{validate_draft, BracketColumn, BracketDraft, BracketEdit, RubricEditor};
pub use error::{BracketError, ConfigError, SaveError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
