//! Region filter: named polygon boundaries used to pre-filter surveys
//!
//! Boundary definitions are loaded once per process from a directory of
//! geometry-container files. The actual geometry extraction is delegated to
//! a [`BoundaryReader`] collaborator; this module only keeps the resolved
//! bounds and answers name / point lookups.

mod geojson;

pub use geojson::GeojsonBoundaryReader;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from boundary loading and geometry delegation
#[derive(Debug, Error)]
pub enum RegionError {
    #[error("Failed to read region directory {0}: {1}")]
    Directory(PathBuf, std::io::Error),

    #[error("Failed to read boundary file {0}: {1}")]
    BoundaryFile(PathBuf, String),

    #[error("Malformed geometry: {0}")]
    Geometry(String),
}

/// Result type for region operations
pub type RegionResult<T> = Result<T, RegionError>;

/// Axis-aligned rectangular spatial filter in lon/lat
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Envelope {
    /// Point containment, inclusive on all edges
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.xmin && lon <= self.xmax && lat >= self.ymin && lat <= self.ymax
    }

    /// Axis-aligned overlap test
    pub fn overlaps(&self, other: &Envelope) -> bool {
        self.xmin <= other.xmax
            && self.xmax >= other.xmin
            && self.ymin <= other.ymax
            && self.ymax >= other.ymin
    }
}

/// Bounds and optional geometry strings extracted from one boundary file
#[derive(Debug, Clone, Default)]
pub struct BoundarySet {
    /// One envelope per feature; a region may cover several disjoint boxes
    pub bounds: Vec<Envelope>,
    /// Well-known-text geometries, when the file carries them
    pub geometries: Vec<String>,
}

/// External geometry collaborator
///
/// Implementations turn a boundary file into per-feature bounding boxes and
/// WKT, and evaluate the spatial intersection predicate. The crawl and query
/// layers never touch geometry math directly.
pub trait BoundaryReader {
    /// Extracts bounds and geometries from one boundary file
    fn read_boundaries(&self, path: &Path) -> RegionResult<BoundarySet>;

    /// True when the WKT geometry intersects any of the region's features
    fn intersects(&self, region: &RegionDefinition, wkt: &str) -> RegionResult<bool>;
}

/// One loaded boundary-file entry; immutable after load
#[derive(Debug, Clone)]
pub struct RegionDefinition {
    /// Stable identifier: file name without extension
    pub name: String,
    /// Full path of the boundary file
    pub path: PathBuf,
    pub bounds: Vec<Envelope>,
    pub geometries: Vec<String>,
}

/// The full set of loaded regions, queried by name or point containment
pub struct RegionSet {
    regions: Vec<RegionDefinition>,
}

impl RegionSet {
    /// Loads every boundary file in a directory
    ///
    /// A file the reader cannot parse is logged as a warning and left out of
    /// the set; it is not fatal. Directory read failure is fatal.
    pub fn load(directory: &Path, reader: &dyn BoundaryReader) -> RegionResult<Self> {
        let entries = std::fs::read_dir(directory)
            .map_err(|e| RegionError::Directory(directory.to_path_buf(), e))?;

        let mut regions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RegionError::Directory(directory.to_path_buf(), e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => continue,
            };
            match reader.read_boundaries(&path) {
                Ok(set) => regions.push(RegionDefinition {
                    name,
                    path,
                    bounds: set.bounds,
                    geometries: set.geometries,
                }),
                Err(e) => {
                    tracing::warn!("Unable to build envelope bounds from {}: {}", name, e);
                }
            }
        }
        tracing::info!(
            "Discovered {} regions from region folder {}",
            regions.len(),
            directory.display()
        );
        Ok(Self { regions })
    }

    /// Builds a set directly from definitions (for testing)
    pub fn from_definitions(regions: Vec<RegionDefinition>) -> Self {
        Self { regions }
    }

    /// Resolves a region by name: exact stored path first, then file stem
    ///
    /// No match logs a warning and returns `None`. Multiple matches are
    /// reported but not rejected; the first wins.
    pub fn resolve_by_name(&self, name: &str) -> Option<&RegionDefinition> {
        // tolerate a name given with its extension
        let stem = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name);

        let matches: Vec<&RegionDefinition> = self
            .regions
            .iter()
            .filter(|r| r.path.as_os_str() == name || r.name == stem)
            .collect();

        match matches.len() {
            0 => {
                tracing::warn!("No matching region for region name: {}", name);
                None
            }
            1 => Some(matches[0]),
            _ => {
                tracing::error!(
                    "Found multiple region matches for {}, returning the first",
                    name
                );
                Some(matches[0])
            }
        }
    }

    /// Returns the names of every region whose bounds contain the point
    pub fn resolve_by_point(&self, lon: f64, lat: f64) -> Vec<&str> {
        let mut found = Vec::new();
        for region in &self.regions {
            if region.bounds.iter().any(|b| b.contains(lon, lat)) {
                found.push(region.name.as_str());
            }
        }
        found
    }

    /// Delegates the intersection predicate to the geometry collaborator
    pub fn intersects(
        &self,
        name: &str,
        wkt: &str,
        reader: &dyn BoundaryReader,
    ) -> RegionResult<bool> {
        match self.resolve_by_name(name) {
            Some(region) => reader.intersects(region, wkt),
            None => Ok(false),
        }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
