// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Summary statistics over the tabular activity projection.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde_json::Value;

use crate::dataset::DatasetView;
use crate::time_utils::format_hms;

/// Aggregate statistics for one sport type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSummary {
    pub sport_type: String,
    pub count: usize,
    pub total_distance_km: f64,
    pub mean_distance_km: f64,
    pub total_moving_time_s: u64,
    pub total_elevation_gain_m: f64,
    /// Activities flagged as commutes
    pub commutes: usize,
    pub commute_distance_km: f64,
}

/// Compute per-type summaries from the projection, ordered by sport type.
pub fn summary_statistics(view: &DatasetView) -> Vec<TypeSummary> {
    let (Some(types), Some(distances), Some(times), Some(elevations), Some(commutes)) = (
        view.column("sport_type"),
        view.column("distance"),
        view.column("moving_time"),
        view.column("total_elevation_gain"),
        view.column("commute"),
    ) else {
        return Vec::new();
    };

    let mut by_type: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (row, sport_type) in types.iter().enumerate() {
        if let Some(sport_type) = sport_type.as_str() {
            by_type.entry(sport_type).or_default().push(row);
        }
    }

    let km = |rows: &[usize], column: &[&Value]| -> f64 {
        rows.iter().map(|&row| column[row].as_f64().unwrap_or(0.0)).sum::<f64>() / 1000.0
    };

    by_type
        .into_iter()
        .map(|(sport_type, rows)| {
            let count = rows.len();
            let total_distance_km = km(&rows, &distances);
            let commute_rows: Vec<usize> = rows
                .iter()
                .copied()
                .filter(|&row| commutes[row].as_bool().unwrap_or(false))
                .collect();
            TypeSummary {
                sport_type: sport_type.to_string(),
                count,
                total_distance_km,
                mean_distance_km: total_distance_km / count as f64,
                total_moving_time_s: rows
                    .iter()
                    .map(|&row| times[row].as_u64().unwrap_or(0))
                    .sum(),
                total_elevation_gain_m: rows
                    .iter()
                    .map(|&row| elevations[row].as_f64().unwrap_or(0.0))
                    .sum(),
                commutes: commute_rows.len(),
                commute_distance_km: km(&commute_rows, &distances),
            }
        })
        .collect()
}

/// Render summaries as a plain-text table for the CLI.
pub fn render_summary(summaries: &[TypeSummary]) -> String {
    if summaries.is_empty() {
        return "No activities found\n".to_string();
    }

    let mut out = String::from(
        "type                 count  distance (km)  mean (km)  moving time  elev gain (m)  commutes  commute (km)\n",
    );
    for s in summaries {
        let _ = writeln!(
            out,
            "{:<20} {:>5}  {:>13.1}  {:>9.1}  {:>11}  {:>13.0}  {:>8}  {:>12.1}",
            s.sport_type,
            s.count,
            s.total_distance_km,
            s.mean_distance_km,
            format_hms(s.total_moving_time_s),
            s.total_elevation_gain_m,
            s.commutes,
            s.commute_distance_km,
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityRecord, Derived};
    use crate::store::RecordStore;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn record(id: u64, sport_type: &str, distance: f64, commute: bool) -> ActivityRecord {
        ActivityRecord {
            id,
            name: format!("Activity {}", id),
            sport_type: sport_type.to_string(),
            start_date: Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap(),
            start_date_local: Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap(),
            distance,
            moving_time: 1800,
            elapsed_time: 1900,
            total_elevation_gain: 100.0,
            polyline: None,
            description: None,
            start_latlng: None,
            end_latlng: None,
            commute,
            trainer: false,
            start_address: Derived::Unattempted,
            end_address: Derived::Unattempted,
            tags: BTreeMap::new(),
        }
    }

    fn view(records: Vec<ActivityRecord>) -> DatasetView {
        let mut store = RecordStore::load("unused.json").unwrap();
        for record in records {
            store.upsert(record);
        }
        DatasetView::from_store(&store)
    }

    #[test]
    fn test_summary_groups_by_type() {
        let view = view(vec![
            record(1, "Ride", 20_000.0, true),
            record(2, "Ride", 30_000.0, false),
            record(3, "Run", 10_000.0, false),
        ]);

        let summaries = summary_statistics(&view);
        assert_eq!(summaries.len(), 2);

        let ride = &summaries[0];
        assert_eq!(ride.sport_type, "Ride");
        assert_eq!(ride.count, 2);
        assert!((ride.total_distance_km - 50.0).abs() < 1e-9);
        assert!((ride.mean_distance_km - 25.0).abs() < 1e-9);
        assert_eq!(ride.total_moving_time_s, 3600);
        assert_eq!(ride.commutes, 1);
        assert!((ride.commute_distance_km - 20.0).abs() < 1e-9);

        assert_eq!(summaries[1].sport_type, "Run");
        assert_eq!(summaries[1].commutes, 0);
        assert!((summaries[1].commute_distance_km - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_render_empty() {
        assert!(render_summary(&[]).contains("No activities"));
    }

    #[test]
    fn test_render_contains_type_rows() {
        let view = view(vec![record(1, "Hike", 8_000.0, false)]);
        let text = render_summary(&summary_statistics(&view));
        assert!(text.contains("Hike"));
        assert!(text.contains("8.0"));
    }
}
