//! External processing collaborator seam
//!
//! The crawl orchestrator hands each finished survey's local raw files to a
//! [`SurveyProcessor`] and records the outcome. Conversion and gridding are
//! someone else's problem; this module only defines the contract and a
//! stand-in used when no processing engine is installed.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by a processing engine
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("No processing engine is available")]
    Unavailable,

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("Grid generation failed: {0}")]
    Gridding(String),
}

/// Everything a processing engine needs for one survey
#[derive(Debug, Clone)]
pub struct ProcessingRequest {
    /// Absolute paths of the downloaded raw files
    pub raw_files: Vec<PathBuf>,
    /// Directory receiving converted data and the grid export
    pub output_directory: PathBuf,
    pub coordinate_system: String,
    pub vertical_reference: String,
    pub grid_type: String,
    /// None lets the engine auto-pick a resolution
    pub resolution: Option<f64>,
    pub grid_format: String,
}

/// Result of a successful processing run
#[derive(Debug, Clone)]
pub struct ProcessingOutcome {
    /// Converted-dataset handles, one per instrument/day grouping
    pub converted: Vec<PathBuf>,
    /// Path of the exported grid; None when gridding did not produce one
    pub export_path: Option<PathBuf>,
}

/// The only contract the crawl orchestrator needs from the processing side
pub trait SurveyProcessor {
    fn process(&self, request: &ProcessingRequest) -> Result<ProcessingOutcome, ProcessingError>;
}

/// Stand-in processor for installations without a processing engine
///
/// Every survey fails processing, so downloads still happen and ledger rows
/// are written without grid paths; a later run with a real engine picks the
/// surveys back up.
#[derive(Debug, Default)]
pub struct UnavailableProcessor;

impl SurveyProcessor for UnavailableProcessor {
    fn process(&self, request: &ProcessingRequest) -> Result<ProcessingOutcome, ProcessingError> {
        tracing::warn!(
            "No processing engine found, skipping processing of {} raw files",
            request.raw_files.len()
        );
        Err(ProcessingError::Unavailable)
    }
}
