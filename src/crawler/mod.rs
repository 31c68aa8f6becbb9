//! Archive crawler
//!
//! Walks the remote archive's directory listings ship by ship, survey by
//! survey, downloading the raw files each survey offers and handing the
//! finished survey off for processing.

mod download;
mod links;
mod walker;

pub use download::{build_output_path, download_survey_file};
pub use links::{classify_file, parse_file_link, parse_listing, survey_boundary, Anchor, FileKind};
pub use walker::Walker;
