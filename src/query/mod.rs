//! Remote catalog query client
//!
//! Resolves a spatial/temporal filter into the matching survey records via
//! the catalog's paginated search API, working around the service's
//! full-record page limit with identifiers-only lookups and bounded id
//! chunks.

mod client;
mod profile;

pub use client::{ship_survey_pairs, CatalogClient, Feature, QueryFilters};
pub use profile::QueryProfile;

use thiserror::Error;

/// Errors from catalog queries
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Failed to build query request: {0}")]
    Request(String),

    #[error("Unparseable catalog response: {0}")]
    Response(String),

    #[error("Catalog service reported an error: {0}")]
    Service(String),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
