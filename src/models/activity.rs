// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity record model for the local store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// A coordinate pair, serialized as a `[lat, lon]` array to match the
/// Strava wire format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng(pub f64, pub f64);

impl LatLng {
    pub fn lat(&self) -> f64 {
        self.0
    }

    pub fn lon(&self) -> f64 {
        self.1
    }
}

/// A locally derived field value.
///
/// Distinguishes "not yet attempted" from "attempted, no match" so the sync
/// engine never re-queries the geocoder for records that legitimately have
/// no result. Serialized as an absent key (`Unattempted`), JSON `null`
/// (`NoMatch`), or a string, keeping the store file human-readable.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Derived {
    /// Enrichment has never run for this field.
    #[default]
    Unattempted,
    /// Enrichment ran and produced no result; do not retry.
    NoMatch,
    /// Enrichment produced a value.
    Value(String),
}

impl Derived {
    pub fn is_unattempted(&self) -> bool {
        matches!(self, Derived::Unattempted)
    }

    /// `true` once enrichment has run, whether or not it matched.
    pub fn is_attempted(&self) -> bool {
        !self.is_unattempted()
    }

    pub fn as_value(&self) -> Option<&str> {
        match self {
            Derived::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Projection for the dataset view: `NoMatch` and `Unattempted` both
    /// surface as null to downstream consumers.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Derived::Value(v) => serde_json::Value::String(v.clone()),
            _ => serde_json::Value::Null,
        }
    }
}

impl Serialize for Derived {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // Unattempted fields are skipped at the struct level; serialize
            // as null if one slips through so the tri-state is never lost.
            Derived::Unattempted | Derived::NoMatch => serializer.serialize_none(),
            Derived::Value(v) => serializer.serialize_str(v),
        }
    }
}

impl<'de> Deserialize<'de> for Derived {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // A present key is always an attempted field: null means no match.
        // Absent keys never reach this impl (serde default = Unattempted).
        match Option::<String>::deserialize(deserializer)? {
            Some(v) => Ok(Derived::Value(v)),
            None => Ok(Derived::NoMatch),
        }
    }
}

/// One Strava activity plus its locally derived enrichment fields.
///
/// Provider fields mirror the Strava API and are always overwritten on
/// re-fetch; derived fields (`start_address`, `end_address`, `tags`) are
/// owned by the enrichment pipeline and survive re-fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Strava activity ID (stable, provider-assigned)
    pub id: u64,
    /// Activity name/title
    pub name: String,
    /// Sport type (Ride, Run, AlpineSki, etc.)
    pub sport_type: String,
    /// Start date/time (UTC)
    pub start_date: DateTime<Utc>,
    /// Start date/time in the activity's local timezone
    pub start_date_local: DateTime<Utc>,
    /// Distance in meters
    pub distance: f64,
    /// Moving time in seconds
    pub moving_time: u64,
    /// Elapsed time in seconds
    pub elapsed_time: u64,
    /// Total elevation gain in meters
    pub total_elevation_gain: f64,
    /// Encoded polyline (precision 5), if the activity has a GPS trace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polyline: Option<String>,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_latlng: Option<LatLng>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_latlng: Option<LatLng>,
    #[serde(default)]
    pub commute: bool,
    /// Recorded on a trainer (no meaningful geometry)
    #[serde(default)]
    pub trainer: bool,
    /// Reverse-geocoded start place name
    #[serde(default, skip_serializing_if = "Derived::is_unattempted")]
    pub start_address: Derived,
    /// Reverse-geocoded end place name
    #[serde(default, skip_serializing_if = "Derived::is_unattempted")]
    pub end_address: Derived,
    /// User-defined columns extracted from the description by tag rules.
    /// Flattened so each tag appears as a top-level column in the store.
    #[serde(flatten)]
    pub tags: BTreeMap<String, String>,
}

impl ActivityRecord {
    /// Merge a freshly fetched copy of the same activity into this record.
    ///
    /// Provider fields always take the incoming value (remote is the source
    /// of truth). Derived fields keep the existing value unless the incoming
    /// record carries an attempted one, so enrichment results survive a
    /// plain re-fetch. Tag columns are merged key-wise, incoming wins.
    pub fn merge_from(&mut self, incoming: ActivityRecord) {
        debug_assert_eq!(self.id, incoming.id);

        let ActivityRecord {
            id: _,
            name,
            sport_type,
            start_date,
            start_date_local,
            distance,
            moving_time,
            elapsed_time,
            total_elevation_gain,
            polyline,
            description,
            start_latlng,
            end_latlng,
            commute,
            trainer,
            start_address,
            end_address,
            tags,
        } = incoming;

        self.name = name;
        self.sport_type = sport_type;
        self.start_date = start_date;
        self.start_date_local = start_date_local;
        self.distance = distance;
        self.moving_time = moving_time;
        self.elapsed_time = elapsed_time;
        self.total_elevation_gain = total_elevation_gain;
        self.polyline = polyline;
        self.description = description;
        self.start_latlng = start_latlng;
        self.end_latlng = end_latlng;
        self.commute = commute;
        self.trainer = trainer;

        if start_address.is_attempted() {
            self.start_address = start_address;
        }
        if end_address.is_attempted() {
            self.end_address = end_address;
        }
        for (column, value) in tags {
            self.tags.insert(column, value);
        }
    }
}
