//! Persisted survey ledger
//!
//! One row per unique (ship, survey) pair, consulted before any network
//! request for that survey is issued. The crawl orchestrator commits a row
//! exactly once per survey subtree, at the moment the walk transitions away
//! from that subtree.

mod schema;
mod sqlite;

pub use schema::initialize_schema;
pub use sqlite::{SurveyLedger, LEDGER_FILE_NAME};

use thiserror::Error;

/// Errors from ledger storage; always fatal to the run
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("No ledger row for {ship}/{survey}")]
    SurveyNotFound { ship: String, survey: String },
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// One ledger row: the outcome of handling a single survey subtree
///
/// A record is "complete" iff `grid_path` is non-empty; complete surveys are
/// skipped on later runs.
#[derive(Debug, Clone, Default)]
pub struct SurveyRecord {
    pub ship_name: String,
    pub survey_name: String,
    pub downloaded_success_count: i64,
    pub downloaded_error_count: i64,
    pub ignored_count: i64,
    pub raw_data_path: String,
    pub processed_data_path: String,
    pub grid_path: String,
}

impl SurveyRecord {
    /// True when a grid export was recorded for this survey
    pub fn is_complete(&self) -> bool {
        !self.grid_path.is_empty()
    }
}
