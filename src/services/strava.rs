// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for fetching activities.
//!
//! Handles:
//! - Paginated activity listing bounded by a date range
//! - Detailed activity fetch (description, polylines, coordinates)
//! - Token refresh when expired, persisted back to the token file
//! - Rate limit and auth error mapping

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::{ActivityRecord, Derived, LatLng};

/// Activities per list page (Strava maximum is 200; 50 matches the
/// original tool's page size).
const PER_PAGE: u32 = 50;

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Remote activity provider consumed by the sync engine.
#[allow(async_fn_in_trait)]
pub trait ActivityProvider {
    /// Fetch all activities with a start time in `[since, until]`.
    async fn fetch(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>>;
}

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://www.strava.com/api/v3".to_string(),
            client_id,
            client_secret,
        }
    }

    /// Get a detailed activity by ID.
    pub async fn get_activity(
        &self,
        access_token: &str,
        activity_id: u64,
    ) -> Result<ActivityDetail> {
        let url = format!("{}/activities/{}", self.base_url, activity_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// List activity summaries for one page of the given time window.
    pub async fn list_activities(
        &self,
        access_token: &str,
        after: i64, // Unix timestamps
        before: i64,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ActivitySummary>> {
        let url = format!("{}/athlete/activities", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("after", after.to_string()),
                ("before", before.to_string()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenRefreshResponse> {
        let response = self
            .http
            .post("https://www.strava.com/oauth/token")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| Error::Auth(format!("Token refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "Token refresh rejected (HTTP {}): {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("Failed to parse token response: {}", e)))
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 401 {
                return Err(Error::Auth(
                    "Strava rejected the access token; re-authorize the application".to_string(),
                ));
            }

            if status.as_u16() == 429 {
                tracing::warn!("Strava rate limit hit (429)");
                return Err(Error::Fetch("Strava API rate limit exceeded".to_string()));
            }

            return Err(Error::Fetch(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("JSON parse error: {}", e)))
    }
}

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

/// Summary activity from the list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivitySummary {
    pub id: u64,
    pub name: String,
    pub start_date: DateTime<Utc>,
}

/// Detailed Strava activity response.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityDetail {
    pub id: u64,
    pub name: String,
    pub sport_type: String,
    pub start_date: DateTime<Utc>,
    pub start_date_local: DateTime<Utc>,
    pub distance: f64,
    pub moving_time: u64,
    pub elapsed_time: u64,
    pub total_elevation_gain: f64,
    pub description: Option<String>,
    pub start_latlng: Option<Vec<f64>>,
    pub end_latlng: Option<Vec<f64>>,
    #[serde(default)]
    pub commute: bool,
    #[serde(default)]
    pub trainer: bool,
    pub map: Option<ActivityMap>,
}

/// Activity map data with polylines.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityMap {
    pub polyline: Option<String>,
    pub summary_polyline: Option<String>,
}

impl ActivityDetail {
    /// Get the detailed polyline, falling back to summary if not available.
    fn polyline(&self) -> Option<String> {
        let map = self.map.as_ref()?;
        map.polyline
            .clone()
            .or_else(|| map.summary_polyline.clone())
            .filter(|p| !p.is_empty())
    }

    /// Convert the wire representation into a store record. Derived fields
    /// start unattempted; enrichment is the sync engine's job.
    pub fn into_record(self) -> ActivityRecord {
        let polyline = self.polyline();
        ActivityRecord {
            id: self.id,
            name: self.name,
            sport_type: self.sport_type,
            start_date: self.start_date,
            start_date_local: self.start_date_local,
            distance: self.distance,
            moving_time: self.moving_time,
            elapsed_time: self.elapsed_time,
            total_elevation_gain: self.total_elevation_gain,
            polyline,
            description: self.description.filter(|d| !d.is_empty()),
            start_latlng: latlng_from_wire(self.start_latlng),
            end_latlng: latlng_from_wire(self.end_latlng),
            commute: self.commute,
            trainer: self.trainer,
            start_address: Derived::Unattempted,
            end_address: Derived::Unattempted,
            tags: BTreeMap::new(),
        }
    }
}

/// Strava sends coordinates as `[lat, lon]`, or `[]` for activities with no
/// GPS data.
fn latlng_from_wire(wire: Option<Vec<f64>>) -> Option<LatLng> {
    match wire.as_deref() {
        Some([lat, lon]) => Some(LatLng(*lat, *lon)),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StravaService - high-level provider with token management
// ─────────────────────────────────────────────────────────────────────────────

/// Persisted OAuth tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp of access token expiry
    pub expires_at: i64,
}

impl StoredTokens {
    fn expires_soon(&self, now: DateTime<Utc>) -> bool {
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);
        DateTime::from_timestamp(self.expires_at, 0)
            .map(|expiry| now + margin >= expiry)
            .unwrap_or(true)
    }
}

/// High-level Strava provider that manages the token lifecycle.
///
/// Tokens are read from a JSON file, refreshed when expiring (with a
/// 5-minute margin), and written back so the next run picks up the rotated
/// refresh token. The interactive authorization flow is out of scope: a
/// missing token file is an auth error with instructions.
pub struct StravaService {
    client: StravaClient,
    tokens_path: PathBuf,
    tokens: Mutex<Option<StoredTokens>>,
}

impl StravaService {
    pub fn new(client_id: String, client_secret: String, tokens_path: PathBuf) -> Self {
        Self {
            client: StravaClient::new(client_id, client_secret),
            tokens_path,
            tokens: Mutex::new(None),
        }
    }

    /// Get a valid (non-expired) access token, refreshing and persisting if
    /// needed.
    pub async fn get_valid_access_token(&self) -> Result<String> {
        let mut tokens = self.tokens.lock().await;

        if tokens.is_none() {
            *tokens = Some(self.read_tokens_file()?);
        }
        let current = tokens.as_mut().ok_or_else(|| {
            Error::Auth("token state unexpectedly empty".to_string())
        })?;

        if !current.expires_soon(Utc::now()) {
            return Ok(current.access_token.clone());
        }

        tracing::info!("Access token expired, refreshing");
        let refreshed = self.client.refresh_token(&current.refresh_token).await?;
        let new_tokens = StoredTokens {
            access_token: refreshed.access_token,
            refresh_token: refreshed.refresh_token,
            expires_at: refreshed.expires_at,
        };
        self.write_tokens_file(&new_tokens)?;
        let access_token = new_tokens.access_token.clone();
        *current = new_tokens;

        tracing::info!("Token refreshed and stored");
        Ok(access_token)
    }

    fn read_tokens_file(&self) -> Result<StoredTokens> {
        let raw = std::fs::read_to_string(&self.tokens_path).map_err(|_| {
            Error::Auth(format!(
                "No Strava tokens at '{}'; authorize the application and store \
                 access_token/refresh_token/expires_at there as JSON",
                self.tokens_path.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            Error::Auth(format!(
                "Token file '{}' is unreadable: {}",
                self.tokens_path.display(),
                e
            ))
        })
    }

    fn write_tokens_file(&self, tokens: &StoredTokens) -> Result<()> {
        if let Some(parent) = self.tokens_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_string_pretty(tokens)
            .map_err(|e| Error::Auth(format!("Failed to encode tokens: {}", e)))?;
        std::fs::write(&self.tokens_path, body)?;
        Ok(())
    }
}

impl ActivityProvider for StravaService {
    /// Fetch detailed data for every activity in the window, in pages of
    /// [`PER_PAGE`] summaries followed by one detail request each.
    async fn fetch(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>> {
        let access_token = self.get_valid_access_token().await?;

        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let summaries = self
                .client
                // Strava's `after`/`before` are exclusive bounds; widen by a
                // second on each side so the window is inclusive of both ends
                // as the trait promises.
                .list_activities(
                    &access_token,
                    since.timestamp() - 1,
                    until.timestamp() + 1,
                    page,
                    PER_PAGE,
                )
                .await?;
            if summaries.is_empty() {
                break;
            }

            for summary in &summaries {
                tracing::info!(
                    activity_id = summary.id,
                    name = %summary.name,
                    "Fetching detailed activity data"
                );
                let detail = self.client.get_activity(&access_token, summary.id).await?;
                records.push(detail.into_record());
            }
            page += 1;
        }

        tracing::info!(count = records.len(), "Fetched activities from Strava");
        Ok(records)
    }
}
