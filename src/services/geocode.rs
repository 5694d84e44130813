// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reverse geocoding via Nominatim.
//!
//! The public service allows roughly one request per second, so calls are
//! spaced by an enforced minimum interval. Transient failures surface as
//! [`Error::Geocode`]; a well-formed "no result" response is `Ok(None)` and
//! is persisted by the sync engine so the lookup is never repeated.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::LatLng;

/// Reverse-geocoding collaborator consumed by the sync engine.
///
/// `Ok(None)` is the explicit no-result sentinel.
#[allow(async_fn_in_trait)]
pub trait Geocoder {
    async fn reverse(&self, point: LatLng) -> Result<Option<String>>;
}

/// Nominatim reverse geocoder with enforced request spacing.
pub struct NominatimGeocoder {
    http: reqwest::Client,
    base_url: String,
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, min_interval: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Block until the minimum spacing since the previous request has
    /// elapsed, then mark this request's start time.
    async fn wait_for_slot(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(delay) = required_delay(*last_call, self.min_interval, Instant::now()) {
            tokio::time::sleep(delay).await;
        }
        *last_call = Some(Instant::now());
    }
}

/// How long to wait before the next request, if at all.
fn required_delay(last: Option<Instant>, min_interval: Duration, now: Instant) -> Option<Duration> {
    let last = last?;
    let elapsed = now.saturating_duration_since(last);
    if elapsed >= min_interval {
        None
    } else {
        Some(min_interval - elapsed)
    }
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    display_name: Option<String>,
    /// Nominatim reports "no result" as an error field on a 200 response
    error: Option<String>,
}

impl NominatimResponse {
    fn place(self) -> Option<String> {
        if self.error.is_some() {
            return None;
        }
        self.display_name.filter(|name| !name.is_empty())
    }
}

impl Geocoder for NominatimGeocoder {
    async fn reverse(&self, point: LatLng) -> Result<Option<String>> {
        self.wait_for_slot().await;

        let url = format!("{}/reverse", self.base_url);
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::USER_AGENT, "strava-mirror/0.1")
            .query(&[
                ("lat", point.lat().to_string()),
                ("lon", point.lon().to_string()),
                ("format", "jsonv2".to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::Geocode(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Geocode(format!("HTTP {}", status)));
        }

        let body: NominatimResponse = response
            .json()
            .await
            .map_err(|e| Error::Geocode(format!("JSON parse error: {}", e)))?;

        Ok(body.place())
    }
}
