// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Incremental synchronization and enrichment engine.
//!
//! One run walks fetch → merge → enrich → save, strictly in that order:
//! 1. Fetch activities from the provider for the effective date range
//!    (explicit range if given, otherwise from the last stored start time)
//! 2. Merge each fetched record into the store (idempotent upsert)
//! 3. Apply tag extraction and reverse geocoding to the records this run
//!    is responsible for; a geocoding failure on one record never aborts
//!    the others
//! 4. Persist the store (atomic replace)
//!
//! A fetch or save failure aborts the run and leaves the store file at its
//! last saved state.

use chrono::{DateTime, Utc};

use crate::config::TagRule;
use crate::error::Result;
use crate::models::{ActivityRecord, Derived, LatLng};
use crate::services::geocode::Geocoder;
use crate::services::strava::ActivityProvider;
use crate::services::tags::extract_tags;
use crate::store::{RecordStore, Upsert};

/// Immutable per-run configuration, injected at construction.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Explicit range start; overrides the incremental bound
    pub range_start: Option<DateTime<Utc>>,
    /// Explicit range end; defaults to now
    pub range_end: Option<DateTime<Utc>>,
    /// Reverse-geocode start/end addresses
    pub reverse_geocoding: bool,
    /// Also enrich activities fetched on earlier runs
    pub update_existing: bool,
    /// Validated description tag rules
    pub tag_rules: Vec<TagRule>,
}

/// Counters for one sync run; geocode failures are summarized here rather
/// than aborting the run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Records whose tag columns changed this run
    pub tagged: usize,
    /// Records that gained at least one geocoded address
    pub geocoded: usize,
    /// Records left unenriched by a transient geocoder failure
    pub geocode_failures: usize,
}

/// Orchestrates one sync run against a record store.
pub struct SyncEngine<P, G> {
    provider: P,
    geocoder: G,
    options: SyncOptions,
}

impl<P: ActivityProvider, G: Geocoder> SyncEngine<P, G> {
    pub fn new(provider: P, geocoder: G, options: SyncOptions) -> Self {
        Self {
            provider,
            geocoder,
            options,
        }
    }

    /// Run one full sync. On success the store has been saved; on error the
    /// store file is unchanged since its last successful save.
    pub async fn run(&self, store: &mut RecordStore) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        // ── Fetch ────────────────────────────────────────────────────
        let (since, until) = self.effective_range(store);
        tracing::info!(since = %since, until = %until, "Checking for new activities");

        let fetched = self.provider.fetch(since, until).await?;

        // The provider is trusted but the range filter is enforced here
        // too, so overlapping or over-wide provider responses cannot leak
        // records outside the requested window into the merge.
        let in_range: Vec<ActivityRecord> = fetched
            .into_iter()
            .filter(|r| r.start_date >= since && r.start_date <= until)
            .collect();
        report.fetched = in_range.len();

        // ── Merge ────────────────────────────────────────────────────
        let mut fetched_ids: Vec<u64> = Vec::with_capacity(in_range.len());
        for record in in_range {
            fetched_ids.push(record.id);
            match store.upsert(record) {
                Upsert::Inserted => report.inserted += 1,
                Upsert::Updated => report.updated += 1,
                Upsert::Unchanged => {}
            }
        }
        tracing::info!(
            fetched = report.fetched,
            inserted = report.inserted,
            updated = report.updated,
            "Merge complete"
        );

        // ── Enrich ───────────────────────────────────────────────────
        let targets = if self.options.update_existing {
            store.ids()
        } else {
            fetched_ids
        };
        for id in targets {
            self.enrich_record(store, id, &mut report).await;
        }

        // ── Save ─────────────────────────────────────────────────────
        store.save()?;

        if report.geocode_failures > 0 {
            tracing::warn!(
                count = report.geocode_failures,
                "Some records could not be geocoded; they will be retried next run"
            );
        }
        tracing::info!(
            tagged = report.tagged,
            geocoded = report.geocoded,
            "Sync complete"
        );
        Ok(report)
    }

    /// Effective fetch window: explicit range if given, otherwise from the
    /// last stored start time (incremental-by-default) to now.
    fn effective_range(&self, store: &RecordStore) -> (DateTime<Utc>, DateTime<Utc>) {
        let since = self
            .options
            .range_start
            .or_else(|| store.last_start_date())
            .unwrap_or(DateTime::UNIX_EPOCH);
        let until = self.options.range_end.unwrap_or_else(Utc::now);
        (since, until)
    }

    /// Enrich one record in place. Transient geocoder failures leave the
    /// affected fields unattempted and are counted, never propagated.
    async fn enrich_record(&self, store: &mut RecordStore, id: u64, report: &mut SyncReport) {
        let Some(existing) = store.get(id) else {
            return;
        };
        let mut record = existing.clone();
        let mut tagged = false;
        let mut geocoded = false;
        let mut failed = false;

        let tags = extract_tags(
            record.description.as_deref(),
            &record.sport_type,
            &self.options.tag_rules,
        );
        for rule in &self.options.tag_rules {
            if !rule.activity_types.iter().any(|t| t == &record.sport_type) {
                continue;
            }
            match tags.get(&rule.column_name) {
                Some(value) => {
                    if record.tags.get(&rule.column_name) != Some(value) {
                        record.tags.insert(rule.column_name.clone(), value.clone());
                        tagged = true;
                    }
                }
                // The rule re-ran against the current description and found
                // nothing; a previously stored value is stale and goes away.
                None => {
                    if record.tags.remove(&rule.column_name).is_some() {
                        tagged = true;
                    }
                }
            }
        }

        if self.options.reverse_geocoding {
            if record.start_address.is_unattempted() {
                if let Some(point) = record.start_latlng {
                    match self.lookup(id, point, "start").await {
                        Some(result) => {
                            record.start_address = result;
                            geocoded = true;
                        }
                        None => failed = true,
                    }
                }
            }
            // Skip the end lookup after a transient failure; the service is
            // almost certainly still down and the record will be retried.
            if !failed && record.end_address.is_unattempted() {
                if let Some(point) = record.end_latlng {
                    match self.lookup(id, point, "end").await {
                        Some(result) => {
                            record.end_address = result;
                            geocoded = true;
                        }
                        None => failed = true,
                    }
                }
            }
        }

        if tagged || geocoded {
            store.upsert(record);
        }
        if tagged {
            report.tagged += 1;
        }
        if geocoded {
            report.geocoded += 1;
        }
        if failed {
            report.geocode_failures += 1;
        }
    }

    /// One reverse lookup. `Some(Derived)` is an attempted outcome (value or
    /// persisted no-match); `None` is a transient failure.
    async fn lookup(&self, id: u64, point: LatLng, which: &str) -> Option<Derived> {
        match self.geocoder.reverse(point).await {
            Ok(Some(name)) => Some(Derived::Value(name)),
            Ok(None) => {
                tracing::debug!(activity_id = id, which, "No geocoding match, caching");
                Some(Derived::NoMatch)
            }
            Err(e) => {
                tracing::warn!(activity_id = id, which, error = %e, "Geocoding unavailable");
                None
            }
        }
    }
}
