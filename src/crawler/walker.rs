//! Crawl orchestrator
//!
//! Walks the ship/survey/file hierarchy depth-first over an explicit work
//! stack, consulting the allowed-survey list and the ledger at each survey
//! boundary, downloading matching files, and handing each finished survey to
//! the external processor before committing its ledger row.
//!
//! Ledger commits lag one survey behind the cursor: the bookkeeping for a
//! survey is finalized when the walk reaches the next boundary (or drains
//! the stack), never mid-traversal.

use crate::config::Config;
use crate::crawler::download::{build_output_path, download_survey_file};
use crate::crawler::links::{classify_file, parse_file_link, parse_listing, survey_boundary, Anchor, FileKind};
use crate::ledger::{SurveyLedger, SurveyRecord};
use crate::net;
use crate::process::{ProcessingRequest, SurveyProcessor};
use crate::{HarvestError, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};

/// Per-survey counters and paths, owned exclusively by the walk
#[derive(Debug, Default)]
struct SurveyProgress {
    ship_name: String,
    survey_name: String,
    downloaded_success_count: i64,
    downloaded_error_count: i64,
    ignored_count: i64,
    raw_data_path: String,
    processed_data_path: String,
}

/// The crawl orchestrator
pub struct Walker {
    config: Config,
    client: Client,
    ledger: SurveyLedger,
    processor: Box<dyn SurveyProcessor>,
    /// (ship, survey) pairs allowed by the region pre-filter; None means no
    /// region restriction is active
    allowed: Option<Vec<(String, String)>>,
    current: SurveyProgress,
}

impl Walker {
    pub fn new(
        config: Config,
        client: Client,
        ledger: SurveyLedger,
        processor: Box<dyn SurveyProcessor>,
        allowed: Option<Vec<(String, String)>>,
    ) -> Self {
        Self {
            config,
            client,
            ledger,
            processor,
            allowed,
            current: SurveyProgress::default(),
        }
    }

    /// Runs the crawl to completion
    pub async fn run(&mut self) -> Result<()> {
        let root = self.config.archive.root_url.clone();
        let mut stack: Vec<(String, u32)> = vec![(root, 0)];

        while let Some((url, depth)) = stack.pop() {
            self.visit_listing(&url, depth, &mut stack).await?;
        }
        // the last survey has no next boundary to trigger its bookkeeping
        self.finalize_current()?;
        Ok(())
    }

    /// Recovers the ledger, e.g. for post-run inspection
    pub fn into_ledger(self) -> SurveyLedger {
        self.ledger
    }

    /// Processes one directory listing
    async fn visit_listing(
        &mut self,
        url: &str,
        depth: u32,
        stack: &mut Vec<(String, u32)>,
    ) -> Result<()> {
        if let Some((ship, survey)) = survey_boundary(url) {
            // entering a new survey subtree: flush the previous one first
            self.finalize_current()?;
            self.current.ship_name = ship;
            self.current.survey_name = survey;
            if !self.allow_survey()? {
                // skipped surveys must not reach the ledger
                self.current = SurveyProgress::default();
                return Ok(());
            }
            tracing::info!(
                "Searching for files in {}/{}",
                self.current.ship_name,
                self.current.survey_name
            );
        }

        let retries = self.config.retry.listing_retries;
        let Some(body) = net::fetch_text(&self.client, url, retries).await else {
            // listing unavailable: this branch simply is not descended
            return Ok(());
        };

        let mut subdirectories: Vec<(String, u32)> = Vec::new();
        for anchor in parse_listing(&body) {
            match self.handle_anchor(url, depth, &anchor, &mut subdirectories).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    tracing::error!("Error handling link {:?} under {}: {}", anchor.href, url, e);
                }
            }
        }
        // LIFO stack: push in reverse to keep listing order
        for entry in subdirectories.into_iter().rev() {
            stack.push(entry);
        }
        Ok(())
    }

    /// Handles one anchor; returns false to stop scanning this listing
    async fn handle_anchor(
        &mut self,
        listing_url: &str,
        depth: u32,
        anchor: &Anchor,
        subdirectories: &mut Vec<(String, u32)>,
    ) -> Result<bool> {
        if !anchor.href.ends_with('/') {
            let file_url = format!("{}{}", listing_url, anchor.href.trim_start_matches('/'));
            // a survey already downloaded and stripped of raw data resumes
            // straight at the processing handoff
            if self.skip_to_gridding(&file_url) {
                return Ok(false);
            }
            self.route_file(&file_url).await?;
            return Ok(true);
        }

        if anchor.is_subdirectory() {
            let name = anchor.text.trim_end_matches('/');
            if depth == 0 {
                if self
                    .config
                    .archive
                    .excluded_ships
                    .iter()
                    .any(|excluded| excluded == name)
                {
                    return Ok(true);
                }
                tracing::info!("Crawling for ship {}", name);
            }
            subdirectories.push((format!("{}{}", listing_url, anchor.href), depth + 1));
        }
        Ok(true)
    }

    /// Evaluates the skip chain at a (ship, survey) boundary
    ///
    /// Conditions are checked in order; the first failure short-circuits to
    /// "skip, do not recurse into this subtree".
    fn allow_survey(&self) -> Result<bool> {
        let ship = &self.current.ship_name;
        let survey = &self.current.survey_name;

        if let Some(allowed) = &self.allowed {
            if allowed.is_empty() {
                tracing::warn!("Region list is empty, were no surveys found for your query?");
                return Ok(false);
            }
            let survey_lower = survey.to_lowercase();
            match allowed.iter().find(|(_, s)| *s == survey_lower) {
                None => {
                    tracing::info!("Skipping {}/{}, survey name not found in region list", ship, survey);
                    return Ok(false);
                }
                Some((allowed_ship, _)) => {
                    // catalog ship names use spaces, archive directories use
                    // underscores; two ships may share a survey identifier
                    if allowed_ship.replace(' ', "_") != ship.to_lowercase() {
                        tracing::info!(
                            "Skipping {}/{}, survey name found but ship name does not match",
                            ship,
                            survey
                        );
                        return Ok(false);
                    }
                }
            }
        }

        if self.ledger.has_completed_grid(ship, survey)? {
            tracing::info!("Skipping {}/{}, already processed once", ship, survey);
            return Ok(false);
        }
        Ok(true)
    }

    /// Detects a survey that downloaded and deleted its raw data in a prior
    /// run but never finished processing
    ///
    /// Trusts "processed dir exists, raw dir missing" as the marker; a
    /// partially populated processed dir from an interrupted engine run is
    /// not detectable here.
    fn skip_to_gridding(&mut self, file_url: &str) -> bool {
        let wanted = &self.config.archive.wanted_extensions;
        let FileKind::Wanted(extension) =
            classify_file(file_url, wanted, &self.config.archive.ignorable_extension)
        else {
            return false;
        };
        let Some((ship, survey, filename)) = parse_file_link(file_url) else {
            return false;
        };

        let output_path = build_output_path(
            Path::new(&self.config.output.directory),
            &extension,
            &ship,
            &survey,
            &filename,
        );
        let Some(raw_dir) = output_path.parent() else {
            return false;
        };
        let processed_dir = sibling_processed_dir(raw_dir);

        if processed_dir.exists() && !raw_dir.exists() {
            self.current.raw_data_path = raw_dir.display().to_string();
            self.current.processed_data_path = processed_dir.display().to_string();
            true
        } else {
            false
        }
    }

    /// Routes one file URL: download it, count it, or pass it by
    async fn route_file(&mut self, file_url: &str) -> Result<()> {
        let wanted = &self.config.archive.wanted_extensions;
        match classify_file(file_url, wanted, &self.config.archive.ignorable_extension) {
            FileKind::Wanted(extension) => {
                let Some((ship, survey, filename)) = parse_file_link(file_url) else {
                    return Err(HarvestError::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("unexpected file url shape: {}", file_url),
                    )));
                };
                let output_path = build_output_path(
                    Path::new(&self.config.output.directory),
                    &extension,
                    &ship,
                    &survey,
                    &filename,
                );
                if let Some(parent) = output_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }

                let retries = self.config.retry.download_retries;
                if download_survey_file(&self.client, file_url, &output_path, retries).await {
                    self.current.downloaded_success_count += 1;
                    if let Some(parent) = output_path.parent() {
                        self.current.raw_data_path = parent.display().to_string();
                        self.current.processed_data_path =
                            sibling_processed_dir(parent).display().to_string();
                    }
                } else {
                    self.current.downloaded_error_count += 1;
                }
            }
            FileKind::Ignorable => {
                self.current.ignored_count += 1;
            }
            FileKind::Other => {}
        }
        Ok(())
    }

    /// Flushes the bookkeeping for the survey the walk just left
    ///
    /// Runs the external processing handoff when raw data accumulated, then
    /// commits one ledger row and resets the counters. Ledger failure is
    /// fatal; processing failure only leaves the survey incomplete.
    fn finalize_current(&mut self) -> Result<()> {
        let progress = std::mem::take(&mut self.current);
        if progress.ship_name.is_empty() || progress.survey_name.is_empty() {
            return Ok(());
        }

        let mut record = SurveyRecord {
            ship_name: progress.ship_name.clone(),
            survey_name: progress.survey_name.clone(),
            downloaded_success_count: progress.downloaded_success_count,
            downloaded_error_count: progress.downloaded_error_count,
            ignored_count: progress.ignored_count,
            raw_data_path: progress.raw_data_path.clone(),
            processed_data_path: String::new(),
            grid_path: String::new(),
        };

        if !progress.raw_data_path.is_empty() {
            let (processed_ok, grid_path) = self.run_handoff(&progress);
            if processed_ok {
                record.processed_data_path = progress.processed_data_path.clone();
            }
            if let Some(grid) = grid_path {
                record.grid_path = grid.display().to_string();
            }
        }

        self.ledger.commit(&record)?;
        Ok(())
    }

    /// Invokes the external processing collaborator for one survey
    ///
    /// Returns (conversion succeeded, grid export path). Raw files are
    /// deleted only after a successful conversion, so a failed handoff can
    /// be retried by a later run.
    fn run_handoff(&self, progress: &SurveyProgress) -> (bool, Option<PathBuf>) {
        let raw_dir = Path::new(&progress.raw_data_path);
        let processed_dir = PathBuf::from(&progress.processed_data_path);

        let raw_files = list_raw_files(raw_dir);
        if let Err(e) = std::fs::create_dir_all(&processed_dir) {
            tracing::error!(
                "Unable to create processed directory {}: {}",
                processed_dir.display(),
                e
            );
            return (false, None);
        }

        let request = ProcessingRequest {
            raw_files,
            output_directory: processed_dir,
            coordinate_system: self.config.processing.coordinate_system.clone(),
            vertical_reference: self.config.processing.vertical_reference.clone(),
            grid_type: self.config.processing.grid_type.clone(),
            resolution: self.config.processing.resolution,
            grid_format: self.config.processing.grid_format.clone(),
        };

        match self.processor.process(&request) {
            Ok(outcome) => {
                // a resumed survey may grid from already-converted data, in
                // which case the engine reports no fresh conversions
                let processed_ok =
                    !outcome.converted.is_empty() || outcome.export_path.is_some();
                if processed_ok && raw_dir.exists() {
                    if let Err(e) = std::fs::remove_dir_all(raw_dir) {
                        tracing::warn!(
                            "Processed {}/{} but could not remove raw data {}: {}",
                            progress.ship_name,
                            progress.survey_name,
                            raw_dir.display(),
                            e
                        );
                    }
                }
                if outcome.export_path.is_none() {
                    tracing::error!(
                        "Processing {}/{} produced no grid export",
                        progress.ship_name,
                        progress.survey_name
                    );
                }
                (processed_ok, outcome.export_path)
            }
            Err(e) => {
                // raw files deliberately kept so a re-run can retry
                tracing::error!(
                    "Processing failed for {}/{}: {}",
                    progress.ship_name,
                    progress.survey_name,
                    e
                );
                (false, None)
            }
        }
    }
}

/// Processed data lands in a `_processed` sibling of the raw directory
fn sibling_processed_dir(raw_dir: &Path) -> PathBuf {
    let mut name = raw_dir.as_os_str().to_os_string();
    name.push("_processed");
    PathBuf::from(name)
}

/// Lists the raw files of one survey; an unreadable directory yields an
/// empty list (the resumption shortcut points at a deleted raw dir)
fn list_raw_files(raw_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(raw_dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    files
}
