// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod analysis;
pub mod geo;
pub mod geocode;
pub mod strava;
pub mod sync;
pub mod tags;

pub use geocode::{Geocoder, NominatimGeocoder};
pub use strava::{ActivityProvider, StravaClient, StravaService};
pub use sync::{SyncEngine, SyncOptions, SyncReport};
pub use tags::extract_tags;
