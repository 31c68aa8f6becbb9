//! Configuration loading and validation
//!
//! All tunables live in one explicit [`Config`] struct passed into each
//! component at construction. A TOML file can override any section; CLI
//! flags override the file (applied in main).

mod parser;
mod types;
mod validation;

pub use parser::{default_config, load_config};
pub use types::{
    ArchiveConfig, Config, OutputConfig, ProcessingConfig, QueryConfig, RegionConfig, RetryConfig,
};
pub use validation::validate;
