//! Remote catalog query client
//!
//! Turns a spatial/temporal filter into the set of matching survey records
//! without a full site crawl. The service cannot return full records beyond
//! a page limit, so each envelope is queried twice: once for the matching
//! object ids, then in id chunks of at most 500 for the full projection.

use crate::net;
use crate::query::{QueryError, QueryProfile, QueryResult};
use crate::regions::{Envelope, RegionSet};
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// Request-scoped filter set for one query call
#[derive(Debug, Clone, Default)]
pub struct QueryFilters {
    /// Inclusive start of the date range
    pub start_date: Option<NaiveDate>,
    /// Inclusive end of the date range
    pub end_date: Option<NaiveDate>,
    /// Explicit spatial envelopes; superseded by `region` when both given
    pub envelopes: Vec<Envelope>,
    /// Named region, resolved through the loaded region set
    pub region: Option<String>,
    /// Output field projection; empty uses the profile's default
    pub out_fields: Vec<String>,
}

/// One record returned by the catalog
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub attributes: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ObjectIdsResponse {
    #[serde(rename = "objectIds")]
    object_ids: Option<Vec<i64>>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct FeatureSetResponse {
    #[serde(default)]
    features: Vec<Feature>,
    error: Option<Value>,
}

/// Catalog search client, one per data type
pub struct CatalogClient {
    client: Client,
    profile: QueryProfile,
    endpoint: String,
    chunk_size: usize,
    retries: u32,
}

impl CatalogClient {
    pub fn new(
        client: Client,
        base_url: &str,
        profile: QueryProfile,
        chunk_size: usize,
        retries: u32,
    ) -> Self {
        Self {
            client,
            endpoint: profile.query_url(base_url),
            profile,
            chunk_size,
            retries,
        }
    }

    /// Issues one filtered query and returns the accumulated features
    ///
    /// A failure against one envelope does not abort the others; the partial
    /// result set is still returned.
    pub async fn query(
        &self,
        filters: &QueryFilters,
        regions: Option<&RegionSet>,
    ) -> QueryResult<Vec<Feature>> {
        let where_clause = self.where_clause(filters);
        let envelopes = resolve_envelopes(filters, regions)?;

        let out_fields = if filters.out_fields.is_empty() {
            self.profile.projection.join(",")
        } else {
            filters.out_fields.join(",")
        };

        let mut features = Vec::new();
        for envelope in &envelopes {
            let ids = self.fetch_object_ids(&where_clause, envelope.as_ref()).await;
            if ids.is_empty() {
                tracing::error!(
                    "No object ids returned for where={:?} envelope={:?}, moving on",
                    where_clause,
                    envelope
                );
                continue;
            }
            for chunk in ids.chunks(self.chunk_size) {
                let mut batch = self.fetch_feature_chunk(chunk, &out_fields).await?;
                features.append(&mut batch);
            }
        }
        Ok(features)
    }

    /// Builds the date predicate from the profile's temporal field names
    ///
    /// Absence of both dates yields an always-true predicate.
    fn where_clause(&self, filters: &QueryFilters) -> String {
        let mut clause = String::new();
        if let Some(start) = filters.start_date {
            clause.push_str(&format!(
                "{} >= date '{}'",
                self.profile.start_field,
                start.format("%Y-%m-%d")
            ));
        }
        if let Some(end) = filters.end_date {
            if !clause.is_empty() {
                clause.push_str(" AND ");
            }
            clause.push_str(&format!(
                "{} <= date '{}'",
                self.profile.end_field,
                end.format("%Y-%m-%d")
            ));
        }
        if clause.is_empty() {
            clause.push_str("1=1");
        }
        clause
    }

    /// First pass: identifiers only, to learn the total match count
    ///
    /// Connection-layer exhaustion and malformed responses both degrade to
    /// an empty id list; the caller logs and continues with other envelopes.
    async fn fetch_object_ids(&self, where_clause: &str, envelope: Option<&Envelope>) -> Vec<i64> {
        let url = match self.build_url(&[
            ("where", where_clause.to_string()),
            ("geometry", envelope.map(envelope_param).unwrap_or_default()),
            ("geometryType", "esriGeometryEnvelope".to_string()),
            ("inSR", "4326".to_string()),
            ("spatialRel", "esriSpatialRelIntersects".to_string()),
            ("returnGeometry", "false".to_string()),
            ("returnIdsOnly", "true".to_string()),
            ("outFields", String::new()),
            ("f", "json".to_string()),
        ]) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Failed to build id query url: {}", e);
                return Vec::new();
            }
        };

        let Some(body) = net::fetch_text(&self.client, url.as_str(), self.retries).await else {
            return Vec::new();
        };
        match serde_json::from_str::<ObjectIdsResponse>(&body) {
            Ok(resp) => {
                if let Some(err) = resp.error {
                    tracing::error!("Error in id query response: {}", err);
                    return Vec::new();
                }
                resp.object_ids.unwrap_or_default()
            }
            Err(e) => {
                tracing::error!("Unparseable id query response: {}", e);
                Vec::new()
            }
        }
    }

    /// Second pass: full projection for one bounded id chunk
    async fn fetch_feature_chunk(
        &self,
        ids: &[i64],
        out_fields: &str,
    ) -> QueryResult<Vec<Feature>> {
        let id_list = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let url = self.build_url(&[
            ("objectIds", id_list),
            ("returnGeometry", "false".to_string()),
            ("returnIdsOnly", "false".to_string()),
            ("outFields", out_fields.to_string()),
            ("f", "json".to_string()),
        ])?;

        let Some(body) = net::fetch_text(&self.client, url.as_str(), self.retries).await else {
            tracing::error!("Chunk of {} ids unavailable, skipping", ids.len());
            return Ok(Vec::new());
        };
        let resp: FeatureSetResponse = serde_json::from_str(&body)
            .map_err(|e| QueryError::Response(e.to_string()))?;
        if let Some(err) = resp.error {
            return Err(QueryError::Service(err.to_string()));
        }
        Ok(resp.features)
    }

    fn build_url(&self, params: &[(&str, String)]) -> QueryResult<Url> {
        Url::parse_with_params(
            &self.endpoint,
            params.iter().map(|(k, v)| (*k, v.as_str())),
        )
        .map_err(|e| QueryError::Request(e.to_string()))
    }
}

/// Resolves the spatial envelope slots for one query
///
/// A named region takes precedence over explicitly supplied envelopes (the
/// override is logged). Neither region nor envelope yields one unfiltered
/// slot. A region name that does not resolve yields no slots at all rather
/// than falling back to a global query.
fn resolve_envelopes(
    filters: &QueryFilters,
    regions: Option<&RegionSet>,
) -> QueryResult<Vec<Option<Envelope>>> {
    if let Some(region_name) = &filters.region {
        if !filters.envelopes.is_empty() {
            tracing::warn!(
                "Both region name and envelope extents provided, region {} supersedes the envelopes",
                region_name
            );
        }
        let Some(regions) = regions else {
            return Err(QueryError::Request(format!(
                "region {} given but no region set was loaded",
                region_name
            )));
        };
        return match regions.resolve_by_name(region_name) {
            Some(region) => Ok(region.bounds.iter().copied().map(Some).collect()),
            None => Ok(Vec::new()),
        };
    }
    if filters.envelopes.is_empty() {
        return Ok(vec![None]);
    }
    Ok(filters.envelopes.iter().copied().map(Some).collect())
}

/// Serializes an envelope the way the catalog expects it
fn envelope_param(envelope: &Envelope) -> String {
    format!(
        "{{'xmin': {}, 'ymin': {}, 'xmax': {}, 'ymax': {}}}",
        envelope.xmin, envelope.ymin, envelope.xmax, envelope.ymax
    )
}

/// Derives unique (ship, survey) pairs from a feature set
///
/// Names are lower-cased; de-duplication is by survey name, first ship wins.
pub fn ship_survey_pairs(
    features: &[Feature],
    ship_field: &str,
    survey_field: &str,
) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for feature in features {
        let ship = feature.attributes.get(ship_field).and_then(Value::as_str);
        let survey = feature.attributes.get(survey_field).and_then(Value::as_str);
        let (Some(ship), Some(survey)) = (ship, survey) else {
            continue;
        };
        let survey = survey.to_lowercase();
        if !pairs.iter().any(|(_, s)| s == &survey) {
            pairs.push((ship.to_lowercase(), survey));
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::RegionDefinition;
    use std::path::PathBuf;

    fn client() -> CatalogClient {
        CatalogClient::new(
            net::build_http_client().unwrap(),
            "https://gis.example.com/services",
            QueryProfile::multibeam(),
            500,
            1,
        )
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_where_clause_both_dates() {
        let filters = QueryFilters {
            start_date: Some(date("2019-05-01")),
            end_date: Some(date("2019-06-01")),
            ..Default::default()
        };
        assert_eq!(
            client().where_clause(&filters),
            "START_TIME >= date '2019-05-01' AND END_TIME <= date '2019-06-01'"
        );
    }

    #[test]
    fn test_where_clause_single_and_no_dates() {
        let start_only = QueryFilters {
            start_date: Some(date("2019-05-01")),
            ..Default::default()
        };
        assert_eq!(client().where_clause(&start_only), "START_TIME >= date '2019-05-01'");

        let end_only = QueryFilters {
            end_date: Some(date("2019-06-01")),
            ..Default::default()
        };
        assert_eq!(client().where_clause(&end_only), "END_TIME <= date '2019-06-01'");

        assert_eq!(client().where_clause(&QueryFilters::default()), "1=1");
    }

    #[test]
    fn test_envelope_param_shape() {
        let env = Envelope {
            xmin: -118.5,
            ymin: 33.2,
            xmax: -118.0,
            ymax: 33.9,
        };
        assert_eq!(
            envelope_param(&env),
            "{'xmin': -118.5, 'ymin': 33.2, 'xmax': -118, 'ymax': 33.9}"
        );
    }

    #[test]
    fn test_resolve_envelopes_region_supersedes() {
        let set = RegionSet::from_definitions(vec![RegionDefinition {
            name: "bay".to_string(),
            path: PathBuf::from("bay.geojson"),
            bounds: vec![
                Envelope { xmin: 0.0, ymin: 0.0, xmax: 1.0, ymax: 1.0 },
                Envelope { xmin: 5.0, ymin: 5.0, xmax: 6.0, ymax: 6.0 },
            ],
            geometries: vec![],
        }]);
        let filters = QueryFilters {
            region: Some("bay".to_string()),
            envelopes: vec![Envelope { xmin: -9.0, ymin: -9.0, xmax: -8.0, ymax: -8.0 }],
            ..Default::default()
        };

        let slots = resolve_envelopes(&filters, Some(&set)).unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].unwrap().xmax, 1.0);
    }

    #[test]
    fn test_resolve_envelopes_unknown_region_yields_nothing() {
        let set = RegionSet::from_definitions(vec![]);
        let filters = QueryFilters {
            region: Some("nowhere".to_string()),
            ..Default::default()
        };
        assert!(resolve_envelopes(&filters, Some(&set)).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_envelopes_global_when_unfiltered() {
        let slots = resolve_envelopes(&QueryFilters::default(), None).unwrap();
        assert_eq!(slots, vec![None]);
    }

    #[test]
    fn test_chunking_never_exceeds_limit() {
        for total in [0usize, 1, 500, 501, 1000] {
            let ids: Vec<i64> = (0..total as i64).collect();
            let chunks: Vec<&[i64]> = ids.chunks(500).collect();
            assert!(chunks.iter().all(|c| c.len() <= 500), "total {}", total);
            let reassembled: usize = chunks.iter().map(|c| c.len()).sum();
            assert_eq!(reassembled, total);
        }
    }

    fn feature(ship: &str, survey: &str) -> Feature {
        let mut attributes = serde_json::Map::new();
        attributes.insert("PLATFORM".to_string(), Value::String(ship.to_string()));
        attributes.insert("SURVEY_ID".to_string(), Value::String(survey.to_string()));
        Feature { attributes }
    }

    #[test]
    fn test_ship_survey_pairs_dedup_and_lowercase() {
        let features = vec![
            feature("Henry B. Bigelow", "HB1901L4"),
            feature("Henry B. Bigelow", "HB1901L4"),
            feature("Okeanos Explorer", "EX1905"),
        ];
        let pairs = ship_survey_pairs(&features, "PLATFORM", "SURVEY_ID");
        assert_eq!(
            pairs,
            vec![
                ("henry b. bigelow".to_string(), "hb1901l4".to_string()),
                ("okeanos explorer".to_string(), "ex1905".to_string()),
            ]
        );
    }

    #[test]
    fn test_ship_survey_pairs_skips_missing_fields() {
        let mut incomplete = feature("ship", "s1");
        incomplete.attributes.remove("SURVEY_ID");
        let pairs = ship_survey_pairs(&[incomplete], "PLATFORM", "SURVEY_ID");
        assert!(pairs.is_empty());
    }
}
