use serde::Deserialize;

/// Main configuration structure for Survey-Harvest
///
/// Every section has sensible defaults, so a config file is optional and
/// partial files only override the pieces they name.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub archive: ArchiveConfig,
    pub output: OutputConfig,
    pub retry: RetryConfig,
    pub query: QueryConfig,
    pub region: RegionConfig,
    pub processing: ProcessingConfig,
}

/// Remote archive layout and file selection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Root URL of the ship/survey/file archive. Changing this will break
    /// the segment indexes used to find ship and survey names.
    #[serde(rename = "root-url")]
    pub root_url: String,

    /// Trailing extensions of raw files worth downloading
    #[serde(rename = "wanted-extensions")]
    pub wanted_extensions: Vec<String>,

    /// Trailing extension counted but never downloaded
    #[serde(rename = "ignorable-extension")]
    pub ignorable_extension: String,

    /// Ship directories skipped at the top level (decommissioned or
    /// irrelevant sources)
    #[serde(rename = "excluded-ships")]
    pub excluded_ships: Vec<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            root_url: "https://data.ngdc.noaa.gov/platforms/ocean/ships/".to_string(),
            wanted_extensions: vec![".mb58.gz".to_string(), ".mb59.gz".to_string()],
            ignorable_extension: ".gz".to_string(),
            excluded_ships: vec![
                "ahi".to_string(),
                "akademik_tryoshnikov".to_string(),
                "amundsen".to_string(),
                "atlantis_ii".to_string(),
                "auriga".to_string(),
                "baruna_jaya_iv".to_string(),
                "bellows".to_string(),
                "boris_petrov".to_string(),
                "davidson".to_string(),
                "discoverer".to_string(),
                "ducer".to_string(),
                "endurance".to_string(),
                "nonpublic".to_string(),
                "test_mbsystem_kmall".to_string(),
                "unknown".to_string(),
            ],
        }
    }
}

/// Local output locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving downloaded data and the survey ledger
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "./working_directory".to_string(),
        }
    }
}

/// Retry bounds for the connection layer
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per directory-listing fetch
    #[serde(rename = "listing-retries")]
    pub listing_retries: u32,

    /// Attempts per file download
    #[serde(rename = "download-retries")]
    pub download_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            listing_retries: 10,
            download_retries: 20,
        }
    }
}

/// Remote catalog search API settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Base URL of the catalog's REST services
    #[serde(rename = "catalog-url")]
    pub catalog_url: String,

    /// Which catalog to query: "multibeam", "hydro-bag" or "hydro-bps"
    #[serde(rename = "data-type")]
    pub data_type: String,

    /// Object ids fetched per follow-up query; the service caps full-record
    /// pages at 500
    #[serde(rename = "chunk-size")]
    pub chunk_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            catalog_url: "https://gis.ngdc.noaa.gov/arcgis/rest/services/web_mercator".to_string(),
            data_type: "multibeam".to_string(),
            chunk_size: 500,
        }
    }
}

/// Optional region restriction
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RegionConfig {
    /// Name of a boundary file (stem) in the region directory
    pub name: Option<String>,

    /// Directory containing region boundary files
    pub directory: Option<String>,
}

/// Settings forwarded to the external processing engine
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// One of NAD83, WGS84
    #[serde(rename = "coordinate-system")]
    pub coordinate_system: String,

    /// One of waterline, ellipse, mllw, NOAA_MLLW, NOAA_MHW
    #[serde(rename = "vertical-reference")]
    pub vertical_reference: String,

    /// One of single_resolution, variable_resolution_tile
    #[serde(rename = "grid-type")]
    pub grid_type: String,

    /// Grid resolution in meters; None lets the engine pick
    pub resolution: Option<f64>,

    /// Export format: one of csv, geotiff, bag
    #[serde(rename = "grid-format")]
    pub grid_format: String,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            coordinate_system: "NAD83".to_string(),
            vertical_reference: "waterline".to_string(),
            grid_type: "single_resolution".to_string(),
            resolution: None,
            grid_format: "bag".to_string(),
        }
    }
}
