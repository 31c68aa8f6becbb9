//! GeoJSON-backed boundary reader
//!
//! Stands in for the full geometry library the processing side uses: it
//! computes per-feature envelopes from coordinate arrays and evaluates the
//! intersects predicate as an envelope overlap. Good enough for the coarse
//! pre-filtering the crawler and query client need.

use crate::regions::{BoundaryReader, BoundarySet, Envelope, RegionDefinition, RegionError, RegionResult};
use serde_json::Value;
use std::path::Path;

/// Reads `.json` / `.geojson` boundary files
#[derive(Debug, Default)]
pub struct GeojsonBoundaryReader;

impl GeojsonBoundaryReader {
    pub fn new() -> Self {
        Self
    }
}

impl BoundaryReader for GeojsonBoundaryReader {
    fn read_boundaries(&self, path: &Path) -> RegionResult<BoundarySet> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !matches!(ext, "json" | "geojson") {
            return Err(RegionError::BoundaryFile(
                path.to_path_buf(),
                format!("unsupported boundary file extension: {:?}", ext),
            ));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| RegionError::BoundaryFile(path.to_path_buf(), e.to_string()))?;
        let doc: Value = serde_json::from_str(&content)
            .map_err(|e| RegionError::BoundaryFile(path.to_path_buf(), e.to_string()))?;

        let mut set = BoundarySet::default();
        match doc.get("features").and_then(Value::as_array) {
            Some(features) => {
                for feature in features {
                    if let Some(geometry) = feature.get("geometry") {
                        if let Some(envelope) = envelope_of_geometry(geometry) {
                            set.bounds.push(envelope);
                        }
                    }
                    // carry along any WKT the producer stored on the feature
                    if let Some(wkt) = feature
                        .get("properties")
                        .and_then(|p| p.get("wkt"))
                        .and_then(Value::as_str)
                    {
                        set.geometries.push(wkt.to_string());
                    }
                }
            }
            None => {
                // bare geometry document
                if let Some(envelope) = envelope_of_geometry(&doc) {
                    set.bounds.push(envelope);
                }
            }
        }

        if set.bounds.is_empty() {
            return Err(RegionError::BoundaryFile(
                path.to_path_buf(),
                "no usable coordinates found".to_string(),
            ));
        }
        Ok(set)
    }

    fn intersects(&self, region: &RegionDefinition, wkt: &str) -> RegionResult<bool> {
        let envelope = envelope_of_wkt(wkt)?;
        Ok(region.bounds.iter().any(|b| b.overlaps(&envelope)))
    }
}

/// Computes the bounding envelope of a GeoJSON geometry object
fn envelope_of_geometry(geometry: &Value) -> Option<Envelope> {
    let coordinates = geometry.get("coordinates")?;
    let mut points = Vec::new();
    collect_positions(coordinates, &mut points);
    envelope_of_points(&points)
}

/// Recursively collects [lon, lat] positions from nested coordinate arrays
fn collect_positions(value: &Value, out: &mut Vec<(f64, f64)>) {
    if let Some(array) = value.as_array() {
        if array.len() >= 2 && array[0].is_number() && array[1].is_number() {
            if let (Some(lon), Some(lat)) = (array[0].as_f64(), array[1].as_f64()) {
                out.push((lon, lat));
            }
            return;
        }
        for item in array {
            collect_positions(item, out);
        }
    }
}

/// Computes the bounding envelope of a WKT geometry string
///
/// Only the coordinate numbers matter for the overlap test, so the geometry
/// kind is ignored and every `x y` pair inside the parentheses is scanned.
fn envelope_of_wkt(wkt: &str) -> RegionResult<Envelope> {
    let inner = match (wkt.find('('), wkt.rfind(')')) {
        (Some(open), Some(close)) if close > open => &wkt[open + 1..close],
        _ => return Err(RegionError::Geometry(format!("no coordinate list in {:?}", wkt))),
    };

    let mut points = Vec::new();
    for pair in inner.split(',') {
        let mut nums = pair
            .split_whitespace()
            .filter_map(|t| t.trim_matches(|c| c == '(' || c == ')').parse::<f64>().ok());
        if let (Some(x), Some(y)) = (nums.next(), nums.next()) {
            points.push((x, y));
        }
    }
    envelope_of_points(&points)
        .ok_or_else(|| RegionError::Geometry(format!("no coordinates parsed from {:?}", wkt)))
}

fn envelope_of_points(points: &[(f64, f64)]) -> Option<Envelope> {
    let (first, rest) = points.split_first()?;
    let mut env = Envelope {
        xmin: first.0,
        ymin: first.1,
        xmax: first.0,
        ymax: first.1,
    };
    for &(x, y) in rest {
        env.xmin = env.xmin.min(x);
        env.ymin = env.ymin.min(y);
        env.xmax = env.xmax.max(x);
        env.ymax = env.ymax.max(y);
    }
    Some(env)
}
