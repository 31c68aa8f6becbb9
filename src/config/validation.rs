use crate::config::types::Config;
use crate::ConfigError;

/// Validates a loaded configuration
///
/// Checks value ranges and enumerated string fields. Returns the first
/// problem found as a `ConfigError::Validation`.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.archive.root_url.is_empty() {
        return Err(ConfigError::Validation(
            "archive.root-url must not be empty".to_string(),
        ));
    }
    if !config.archive.root_url.ends_with('/') {
        return Err(ConfigError::Validation(
            "archive.root-url must end with a trailing slash".to_string(),
        ));
    }
    if config.archive.wanted_extensions.is_empty() {
        return Err(ConfigError::Validation(
            "archive.wanted-extensions must name at least one extension".to_string(),
        ));
    }

    if config.retry.listing_retries == 0 {
        return Err(ConfigError::Validation(
            "retry.listing-retries must be at least 1".to_string(),
        ));
    }
    if config.retry.download_retries == 0 {
        return Err(ConfigError::Validation(
            "retry.download-retries must be at least 1".to_string(),
        ));
    }

    if config.query.chunk_size == 0 || config.query.chunk_size > 500 {
        return Err(ConfigError::Validation(format!(
            "query.chunk-size must be between 1 and 500, got {}",
            config.query.chunk_size
        )));
    }
    if !matches!(
        config.query.data_type.as_str(),
        "multibeam" | "hydro-bag" | "hydro-bps"
    ) {
        return Err(ConfigError::Validation(format!(
            "query.data-type must be one of multibeam, hydro-bag, hydro-bps, got {}",
            config.query.data_type
        )));
    }

    if !matches!(
        config.processing.coordinate_system.as_str(),
        "NAD83" | "WGS84"
    ) {
        return Err(ConfigError::Validation(format!(
            "processing.coordinate-system must be NAD83 or WGS84, got {}",
            config.processing.coordinate_system
        )));
    }
    if !matches!(
        config.processing.vertical_reference.as_str(),
        "waterline" | "ellipse" | "mllw" | "NOAA_MLLW" | "NOAA_MHW"
    ) {
        return Err(ConfigError::Validation(format!(
            "processing.vertical-reference not recognized: {}",
            config.processing.vertical_reference
        )));
    }
    if !matches!(
        config.processing.grid_type.as_str(),
        "single_resolution" | "variable_resolution_tile"
    ) {
        return Err(ConfigError::Validation(format!(
            "processing.grid-type not recognized: {}",
            config.processing.grid_type
        )));
    }
    // Variable resolution grids pick their own cell sizes
    if config.processing.grid_type == "variable_resolution_tile"
        && config.processing.resolution.is_some()
    {
        return Err(ConfigError::Validation(
            "processing.resolution must be unset for variable_resolution_tile grids".to_string(),
        ));
    }
    if !matches!(
        config.processing.grid_format.as_str(),
        "csv" | "geotiff" | "bag"
    ) {
        return Err(ConfigError::Validation(format!(
            "processing.grid-format must be one of csv, geotiff, bag, got {}",
            config.processing.grid_format
        )));
    }

    if config.region.name.is_some() && config.region.directory.is_none() {
        return Err(ConfigError::Validation(
            "region.name requires region.directory to be set".to_string(),
        ));
    }

    Ok(())
}
