// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared fixtures: record builders plus fake provider/geocoder
//! implementations over the sync engine's trait seams.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use strava_mirror::error::{Error, Result};
use strava_mirror::models::{ActivityRecord, Derived, LatLng};
use strava_mirror::services::{ActivityProvider, Geocoder};

/// Build a plain fetched record (no derived values) starting at `start`.
pub fn record(id: u64, sport_type: &str, start: DateTime<Utc>) -> ActivityRecord {
    ActivityRecord {
        id,
        name: format!("Activity {}", id),
        sport_type: sport_type.to_string(),
        start_date: start,
        start_date_local: start,
        distance: 10_000.0,
        moving_time: 1800,
        elapsed_time: 2000,
        total_elevation_gain: 150.0,
        polyline: None,
        description: None,
        start_latlng: Some(LatLng(45.9, 6.8)),
        end_latlng: None,
        commute: false,
        trainer: false,
        start_address: Derived::Unattempted,
        end_address: Derived::Unattempted,
        tags: BTreeMap::new(),
    }
}

pub fn day(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 8, 0, 0).unwrap()
}

/// Provider returning a canned activity list, ignoring the requested range
/// so tests exercise the engine's own range filter.
#[derive(Clone, Default)]
pub struct FakeProvider {
    pub activities: Vec<ActivityRecord>,
    pub fail: bool,
}

impl FakeProvider {
    pub fn returning(activities: Vec<ActivityRecord>) -> Self {
        Self {
            activities,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            activities: Vec::new(),
            fail: true,
        }
    }
}

impl ActivityProvider for FakeProvider {
    async fn fetch(
        &self,
        _since: DateTime<Utc>,
        _until: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>> {
        if self.fail {
            return Err(Error::Fetch("connection reset by peer".to_string()));
        }
        Ok(self.activities.clone())
    }
}

#[derive(Clone)]
pub enum GeocodeBehavior {
    Value(String),
    NoMatch,
    Fail,
}

/// Geocoder with a fixed behavior and a shared call counter.
#[derive(Clone)]
pub struct FakeGeocoder {
    behavior: GeocodeBehavior,
    calls: Arc<AtomicUsize>,
}

impl FakeGeocoder {
    pub fn new(behavior: GeocodeBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Geocoder for FakeGeocoder {
    async fn reverse(&self, _point: LatLng) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            GeocodeBehavior::Value(name) => Ok(Some(name.clone())),
            GeocodeBehavior::NoMatch => Ok(None),
            GeocodeBehavior::Fail => Err(Error::Geocode("HTTP 503".to_string())),
        }
    }
}

/// A geocoder that never expects to be called.
#[derive(Clone)]
pub struct PanicGeocoder;

impl Geocoder for PanicGeocoder {
    async fn reverse(&self, point: LatLng) -> Result<Option<String>> {
        panic!("unexpected geocoder call for ({}, {})", point.lat(), point.lon());
    }
}
