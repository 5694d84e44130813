// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava-Mirror: a locally persisted, incrementally updated mirror of a
//! Strava activity history, enriched with reverse-geocoded place names and
//! tag columns parsed from activity descriptions.
//!
//! The core is the sync engine ([`services::SyncEngine`]): it decides which
//! remote activities are new or changed, merges them into the local store
//! without loss or duplication, and applies enrichment idempotently across
//! repeated runs.

pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod time_utils;
