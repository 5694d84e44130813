// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GeoJSON export of activity traces.
//!
//! Writes one LineString feature per real outdoor activity (trainer and
//! virtual activities are excluded) with the name, type, local start date,
//! distance, formatted moving time, and elevation gain as properties.

use std::path::Path;

use geo::LineString;
use geojson::{Feature, FeatureCollection, GeoJson};
use serde_json::json;

use crate::error::Result;
use crate::models::ActivityRecord;
use crate::store::RecordStore;
use crate::time_utils::{format_hms, format_utc_rfc3339};

/// Activity types with synthetic geometry that is not worth mapping.
const EXCLUDED_TYPES: &[&str] = &["VirtualRide", "VirtualRun"];

/// Export geospatial data for all mappable activities. Returns the number
/// of features written.
pub fn export_geojson<P: AsRef<Path>>(store: &RecordStore, path: P) -> Result<usize> {
    let path = path.as_ref();
    tracing::info!("Processing geospatial data");

    let mut features = Vec::new();
    for record in store.iter() {
        if let Some(feature) = feature_for(record) {
            features.push(feature);
        }
    }

    let collection = GeoJson::from(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    });

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, collection.to_string())?;

    let count = match &collection {
        GeoJson::FeatureCollection(fc) => fc.features.len(),
        _ => 0,
    };
    tracing::info!(path = %path.display(), count, "Exported geospatial data");
    Ok(count)
}

/// Build the feature for one activity, or `None` if it has no mappable
/// geometry.
fn feature_for(record: &ActivityRecord) -> Option<Feature> {
    if record.trainer || EXCLUDED_TYPES.contains(&record.sport_type.as_str()) {
        return None;
    }
    let encoded = record.polyline.as_deref()?;

    let line: LineString<f64> = match polyline::decode_polyline(encoded, 5) {
        Ok(line) => line,
        Err(e) => {
            tracing::warn!(activity_id = record.id, error = %e, "Skipping undecodable polyline");
            return None;
        }
    };
    if line.0.is_empty() {
        return None;
    }

    let properties = json!({
        "name": record.name,
        "id": record.id,
        "type": record.sport_type,
        "local start date": format_utc_rfc3339(record.start_date_local),
        "distance (km)": record.distance / 1000.0,
        "moving time": format_hms(record.moving_time),
        "total elevation gain (m)": record.total_elevation_gain,
    });
    let properties = match properties {
        serde_json::Value::Object(map) => map,
        _ => return None,
    };

    Some(Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&line))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Derived;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn record(id: u64, sport_type: &str, polyline: Option<&str>) -> ActivityRecord {
        ActivityRecord {
            id,
            name: format!("Activity {}", id),
            sport_type: sport_type.to_string(),
            start_date: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            start_date_local: Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap(),
            distance: 12_345.0,
            moving_time: 3725,
            elapsed_time: 4000,
            total_elevation_gain: 250.0,
            polyline: polyline.map(String::from),
            description: None,
            start_latlng: None,
            end_latlng: None,
            commute: false,
            trainer: false,
            start_address: Derived::Unattempted,
            end_address: Derived::Unattempted,
            tags: BTreeMap::new(),
        }
    }

    // Two-point polyline from the Google polyline reference docs.
    const POLYLINE: &str = "_p~iF~ps|U_ulLnnqC";

    #[test]
    fn test_feature_properties() {
        let feature = feature_for(&record(1, "Ride", Some(POLYLINE))).unwrap();
        assert!(feature.geometry.is_some());

        let properties = feature.properties.unwrap();
        assert_eq!(properties["type"], "Ride");
        assert_eq!(properties["distance (km)"], 12.345);
        assert_eq!(properties["moving time"], "1:02:05");
    }

    #[test]
    fn test_trainer_and_virtual_excluded() {
        let mut trainer = record(2, "Ride", Some(POLYLINE));
        trainer.trainer = true;
        assert!(feature_for(&trainer).is_none());

        assert!(feature_for(&record(3, "VirtualRide", Some(POLYLINE))).is_none());
    }

    #[test]
    fn test_no_polyline_skipped() {
        assert!(feature_for(&record(4, "Run", None)).is_none());
    }

    #[test]
    fn test_export_writes_feature_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/activities.geojson");

        let mut store = RecordStore::load(dir.path().join("activities.json")).unwrap();
        store.upsert(record(1, "Ride", Some(POLYLINE)));
        store.upsert(record(2, "Run", None));

        let count = export_geojson(&store, &path).unwrap();
        assert_eq!(count, 1);

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: GeoJson = raw.parse().unwrap();
        match parsed {
            GeoJson::FeatureCollection(fc) => assert_eq!(fc.features.len(), 1),
            other => panic!("expected FeatureCollection, got {:?}", other),
        }
    }
}
