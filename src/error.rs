// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types.
//!
//! Fatal errors (`Auth`, `Fetch`, `CorruptStore`, `EnrichmentRule`, `Config`)
//! abort a sync run; `Geocode` is transient and handled per record by the
//! sync engine.

use std::path::PathBuf;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Strava authentication failed: {0}")]
    Auth(String),

    #[error("Failed to fetch activities: {0}")]
    Fetch(String),

    #[error("Activity store '{path}' is corrupt: {reason}")]
    CorruptStore { path: PathBuf, reason: String },

    #[error("Reverse geocoding unavailable: {0}")]
    Geocode(String),

    #[error("Invalid description tag rule: {0}")]
    EnrichmentRule(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
