//! Survey-Harvest: crawl, query, and track survey datasets on a remote archive
//!
//! This crate walks a ship/survey/file archive over HTTP, optionally restricts
//! the walk to surveys matching a spatial region query against the remote
//! catalog, downloads matching raw files, hands completed surveys to an
//! external processing engine, and records the outcome in a persisted ledger
//! so interrupted runs resume without redoing finished work.

pub mod config;
pub mod crawler;
pub mod ledger;
pub mod net;
pub mod process;
pub mod query;
pub mod regions;

use thiserror::Error;

/// Main error type for Survey-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger::LedgerError),

    #[error("Region error: {0}")]
    Region(#[from] regions::RegionError),

    #[error("Catalog query error: {0}")]
    Query(#[from] query::QueryError),

    #[error("Processing error: {0}")]
    Processing(#[from] process::ProcessingError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Survey-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Walker;
pub use ledger::{SurveyLedger, SurveyRecord};
pub use query::{CatalogClient, QueryFilters, QueryProfile};
pub use regions::{Envelope, RegionSet};
