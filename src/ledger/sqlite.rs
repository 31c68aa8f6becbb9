//! SQLite-backed survey ledger
//!
//! The ledger is the single source of truth for "has this survey already
//! been fully handled". Records are insert-only: once committed, a row is
//! never updated, only removed by an explicit operator action.

use crate::ledger::schema::initialize_schema;
use crate::ledger::{LedgerError, LedgerResult, SurveyRecord};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// File name of the ledger database inside the output directory
pub const LEDGER_FILE_NAME: &str = "survey_ledger.sqlite3";

/// Persisted survey ledger
pub struct SurveyLedger {
    conn: Connection,
}

impl SurveyLedger {
    /// Opens or creates the ledger in the given output directory
    ///
    /// Creates the schema if absent. Any storage error propagates: the
    /// ledger has no degraded mode, the idempotency guarantee collapses
    /// without it.
    pub fn open(output_directory: &Path) -> LedgerResult<Self> {
        let path: PathBuf = output_directory.join(LEDGER_FILE_NAME);
        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory ledger (for testing)
    pub fn open_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Checks whether a row exists for this (ship, survey) pair
    ///
    /// Both names are compared case-insensitively; rows are stored
    /// lowercased at commit time.
    pub fn exists(&self, ship_name: &str, survey_name: &str) -> LedgerResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM surveys WHERE ship_name = ?1 AND survey_name = ?2",
            params![ship_name.to_lowercase(), survey_name.to_lowercase()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// True only if a non-empty grid path is recorded for this pair
    pub fn has_completed_grid(&self, ship_name: &str, survey_name: &str) -> LedgerResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM surveys
             WHERE ship_name = ?1 AND survey_name = ?2 AND grid_path != ''",
            params![ship_name.to_lowercase(), survey_name.to_lowercase()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Commits one survey record
    ///
    /// Silent no-op when ship or survey name is empty (guards against
    /// committing a partially populated in-progress record) or when the pair
    /// is already present — no upsert semantics.
    pub fn commit(&mut self, record: &SurveyRecord) -> LedgerResult<()> {
        if record.ship_name.is_empty() || record.survey_name.is_empty() {
            return Ok(());
        }
        if self.exists(&record.ship_name, &record.survey_name)? {
            return Ok(());
        }
        tracing::info!(
            "Adding new data for {}/{} to the survey ledger",
            record.ship_name,
            record.survey_name
        );
        self.conn.execute(
            "INSERT INTO surveys (ship_name, survey_name, downloaded_success, downloaded_error,
                                  ignored, raw_data_path, processed_data_path, grid_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.ship_name.to_lowercase(),
                record.survey_name.to_lowercase(),
                record.downloaded_success_count,
                record.downloaded_error_count,
                record.ignored_count,
                record.raw_data_path,
                record.processed_data_path,
                record.grid_path,
            ],
        )?;
        Ok(())
    }

    /// Removes one survey row; operator-invoked only
    pub fn remove(&mut self, ship_name: &str, survey_name: &str) -> LedgerResult<()> {
        let removed = self.conn.execute(
            "DELETE FROM surveys WHERE ship_name = ?1 AND survey_name = ?2",
            params![ship_name.to_lowercase(), survey_name.to_lowercase()],
        )?;
        if removed == 0 {
            return Err(LedgerError::SurveyNotFound {
                ship: ship_name.to_lowercase(),
                survey: survey_name.to_lowercase(),
            });
        }
        Ok(())
    }

    /// Returns every recorded survey, ordered by ship then survey
    pub fn all_records(&self) -> LedgerResult<Vec<SurveyRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT ship_name, survey_name, downloaded_success, downloaded_error, ignored,
                    raw_data_path, processed_data_path, grid_path
             FROM surveys ORDER BY ship_name, survey_name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SurveyRecord {
                ship_name: row.get(0)?,
                survey_name: row.get(1)?,
                downloaded_success_count: row.get(2)?,
                downloaded_error_count: row.get(3)?,
                ignored_count: row.get(4)?,
                raw_data_path: row.get(5)?,
                processed_data_path: row.get(6)?,
                grid_path: row.get(7)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ship: &str, survey: &str, grid: &str) -> SurveyRecord {
        SurveyRecord {
            ship_name: ship.to_string(),
            survey_name: survey.to_string(),
            downloaded_success_count: 2,
            downloaded_error_count: 0,
            ignored_count: 1,
            raw_data_path: "/data/ship/survey".to_string(),
            processed_data_path: "/data/ship/survey_processed".to_string(),
            grid_path: grid.to_string(),
        }
    }

    #[test]
    fn test_commit_then_exists_lowercases() {
        let mut ledger = SurveyLedger::open_in_memory().unwrap();
        ledger.commit(&record("Alpha", "S1", "")).unwrap();

        // Mixed-case lookups match the lowercased row
        assert!(ledger.exists("alpha", "s1").unwrap());
        assert!(ledger.exists("ALPHA", "S1").unwrap());
        assert!(!ledger.exists("beta", "s1").unwrap());

        let rows = ledger.all_records().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ship_name, "alpha");
        assert_eq!(rows[0].survey_name, "s1");
    }

    #[test]
    fn test_completed_grid_requires_nonempty_path() {
        let mut ledger = SurveyLedger::open_in_memory().unwrap();
        ledger.commit(&record("alpha", "s1", "")).unwrap();
        ledger.commit(&record("alpha", "s2", "/g/out.bag")).unwrap();

        assert!(!ledger.has_completed_grid("alpha", "s1").unwrap());
        assert!(ledger.has_completed_grid("alpha", "s2").unwrap());
        assert!(!ledger.has_completed_grid("alpha", "s3").unwrap());
    }

    #[test]
    fn test_commit_skips_empty_names() {
        let mut ledger = SurveyLedger::open_in_memory().unwrap();
        ledger.commit(&record("", "s1", "")).unwrap();
        ledger.commit(&record("alpha", "", "")).unwrap();
        assert!(ledger.all_records().unwrap().is_empty());
    }

    #[test]
    fn test_commit_is_insert_only() {
        let mut ledger = SurveyLedger::open_in_memory().unwrap();
        ledger.commit(&record("alpha", "s1", "")).unwrap();

        let mut second = record("alpha", "s1", "/g/out.bag");
        second.downloaded_success_count = 99;
        ledger.commit(&second).unwrap();

        // First commit wins; the second was silently ignored
        let rows = ledger.all_records().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].downloaded_success_count, 2);
        assert_eq!(rows[0].grid_path, "");
    }

    #[test]
    fn test_remove_survey() {
        let mut ledger = SurveyLedger::open_in_memory().unwrap();
        ledger.commit(&record("alpha", "s1", "")).unwrap();
        ledger.remove("Alpha", "S1").unwrap();
        assert!(!ledger.exists("alpha", "s1").unwrap());

        let err = ledger.remove("alpha", "s1").unwrap_err();
        assert!(matches!(err, LedgerError::SurveyNotFound { .. }));
    }

    #[test]
    fn test_open_creates_file(){
        let dir = tempfile::tempdir().unwrap();
        let _ledger = SurveyLedger::open(dir.path()).unwrap();
        assert!(dir.path().join(LEDGER_FILE_NAME).exists());
    }
}
