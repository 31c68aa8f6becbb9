//! Ledger schema definition

/// SQL schema for the survey ledger
///
/// One row per (ship_name, survey_name) pair; a survey is complete iff
/// grid_path is non-empty.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS surveys (
    ship_name TEXT NOT NULL,
    survey_name TEXT NOT NULL,
    downloaded_success INTEGER NOT NULL DEFAULT 0,
    downloaded_error INTEGER NOT NULL DEFAULT 0,
    ignored INTEGER NOT NULL DEFAULT 0,
    raw_data_path TEXT NOT NULL DEFAULT '',
    processed_data_path TEXT NOT NULL DEFAULT '',
    grid_path TEXT NOT NULL DEFAULT '',
    UNIQUE(ship_name, survey_name)
);

CREATE INDEX IF NOT EXISTS idx_surveys_names ON surveys(ship_name, survey_name);
"#;

/// Initializes the ledger schema, idempotently
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
