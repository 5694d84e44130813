// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tabular projection of the record store for downstream consumers
//! (statistics, GeoJSON export, plotting).

use std::collections::BTreeSet;

use serde_json::Value;

use crate::store::RecordStore;

/// Columns supplied by the provider, in presentation order.
pub const PROVIDER_COLUMNS: &[&str] = &[
    "id",
    "name",
    "sport_type",
    "start_date",
    "start_date_local",
    "distance",
    "moving_time",
    "elapsed_time",
    "total_elevation_gain",
    "polyline",
    "description",
    "start_latlng",
    "end_latlng",
    "commute",
    "trainer",
];

/// Derived columns always present in the projection.
pub const DERIVED_COLUMNS: &[&str] = &["start_address", "end_address"];

/// One row per activity, one column per provider field plus every derived
/// column ever populated. Missing values are `null`.
#[derive(Debug)]
pub struct DatasetView {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl DatasetView {
    /// Build the projection from the store.
    pub fn from_store(store: &RecordStore) -> Self {
        // Tag columns are whatever keys appear beyond the fixed set, in
        // sorted order so the projection is stable across runs.
        let mut tag_columns = BTreeSet::new();
        for record in store.iter() {
            for column in record.tags.keys() {
                tag_columns.insert(column.clone());
            }
        }

        let columns: Vec<String> = PROVIDER_COLUMNS
            .iter()
            .chain(DERIVED_COLUMNS.iter())
            .map(|c| c.to_string())
            .chain(tag_columns)
            .collect();

        let rows = store
            .iter()
            .map(|record| {
                // Tri-state derived fields serialize with absent keys for
                // Unattempted; the projection folds those to null.
                let mut object = match serde_json::to_value(record) {
                    Ok(Value::Object(map)) => map,
                    _ => serde_json::Map::new(),
                };
                columns
                    .iter()
                    .map(|column| object.remove(column.as_str()).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of one column, or `None` for an unknown column name.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityRecord, Derived, LatLng};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn record(id: u64, sport_type: &str) -> ActivityRecord {
        ActivityRecord {
            id,
            name: format!("Activity {}", id),
            sport_type: sport_type.to_string(),
            start_date: Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap(),
            start_date_local: Utc.with_ymd_and_hms(2024, 2, 1, 11, 0, 0).unwrap(),
            distance: 5_000.0,
            moving_time: 1200,
            elapsed_time: 1300,
            total_elevation_gain: 80.0,
            polyline: None,
            description: None,
            start_latlng: Some(LatLng(46.0, 7.0)),
            end_latlng: None,
            commute: false,
            trainer: false,
            start_address: Derived::Unattempted,
            end_address: Derived::Unattempted,
            tags: BTreeMap::new(),
        }
    }

    #[test]
    fn test_columns_are_union_of_tag_columns() {
        let mut store = RecordStore::load("unused.json").unwrap();
        let mut a = record(1, "AlpineSki");
        a.tags.insert("ski_type".to_string(), "Atomic".to_string());
        let mut b = record(2, "Ride");
        b.tags.insert("bike".to_string(), "Canyon".to_string());
        store.upsert(a);
        store.upsert(b);

        let view = DatasetView::from_store(&store);
        assert!(view.columns().contains(&"ski_type".to_string()));
        assert!(view.columns().contains(&"bike".to_string()));
        assert_eq!(view.len(), 2);

        // Records without a given tag read as null.
        let ski = view.column("ski_type").unwrap();
        assert_eq!(ski[0], &Value::String("Atomic".to_string()));
        assert!(ski[1].is_null());
    }

    #[test]
    fn test_unattempted_derived_fields_read_as_null() {
        let mut store = RecordStore::load("unused.json").unwrap();
        let mut a = record(1, "Ride");
        a.start_address = Derived::Value("Geneva".to_string());
        store.upsert(a);
        store.upsert(record(2, "Run"));

        let view = DatasetView::from_store(&store);
        let addresses = view.column("start_address").unwrap();
        assert_eq!(addresses[0], &Value::String("Geneva".to_string()));
        assert!(addresses[1].is_null());
        assert!(view.column("no_such_column").is_none());
    }

    #[test]
    fn test_row_order_matches_column_order() {
        let mut store = RecordStore::load("unused.json").unwrap();
        store.upsert(record(9, "Run"));

        let view = DatasetView::from_store(&store);
        let id_index = view.columns().iter().position(|c| c == "id").unwrap();
        assert_eq!(view.rows()[0][id_index], Value::from(9u64));
    }
}
