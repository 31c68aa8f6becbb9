//! Catalog query profiles
//!
//! Different catalogs expose different temporal fields and live under
//! different service paths. A profile is the small configuration record that
//! selects one; there is one query client, parameterized by profile.

/// Per-data-type catalog parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryProfile {
    /// Catalog path segment under the services root
    pub service: &'static str,
    /// Layer index under the MapServer endpoint
    pub layer: u8,
    /// Temporal field compared against the filter's start date
    pub start_field: &'static str,
    /// Temporal field compared against the filter's end date
    pub end_field: &'static str,
    /// Default output field projection
    pub projection: &'static [&'static str],
}

impl QueryProfile {
    /// Raw multibeam survey catalog
    pub fn multibeam() -> Self {
        Self {
            service: "multibeam_dynamic",
            layer: 0,
            start_field: "START_TIME",
            end_field: "END_TIME",
            projection: &["OBJECTID", "PLATFORM", "SURVEY_ID", "START_TIME", "END_TIME"],
        }
    }

    /// Hydrographic survey catalog, gridded BAG products
    pub fn hydro_bag() -> Self {
        Self {
            service: "nos_hydro_dynamic",
            layer: 0,
            start_field: "DATE_SURVEY_BEGIN",
            end_field: "DATE_SURVEY_END",
            projection: &[
                "OBJECTID",
                "PLATFORM",
                "SURVEY_ID",
                "DATE_SURVEY_BEGIN",
                "DATE_SURVEY_END",
            ],
        }
    }

    /// Hydrographic survey catalog, BPS products
    pub fn hydro_bps() -> Self {
        Self {
            service: "nos_hydro_dynamic",
            layer: 1,
            start_field: "DATE_SURVEY_BEGIN",
            end_field: "DATE_SURVEY_END",
            projection: &[
                "OBJECTID",
                "PLATFORM",
                "SURVEY_ID",
                "DATE_SURVEY_BEGIN",
                "DATE_SURVEY_END",
            ],
        }
    }

    /// Selects a profile by its configured name
    pub fn for_data_type(name: &str) -> Option<Self> {
        match name {
            "multibeam" => Some(Self::multibeam()),
            "hydro-bag" => Some(Self::hydro_bag()),
            "hydro-bps" => Some(Self::hydro_bps()),
            _ => None,
        }
    }

    /// Full query endpoint under the services root
    pub fn query_url(&self, base_url: &str) -> String {
        format!(
            "{}/{}/MapServer/{}/query",
            base_url.trim_end_matches('/'),
            self.service,
            self.layer
        )
    }
}
