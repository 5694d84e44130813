// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration.
//!
//! Non-sensitive settings live in a TOML file; Strava API credentials come
//! from the environment (or a `.env` file) so they stay out of version
//! control. Tag rules are validated at load time, before any fetch begins.

use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dataset::{DERIVED_COLUMNS, PROVIDER_COLUMNS};
use crate::error::{Error, Result};

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
}

/// File locations.
#[derive(Debug, Clone, Deserialize)]
pub struct Paths {
    /// Activity store (JSON Lines)
    #[serde(default = "default_activity_file")]
    pub activity_data_file: PathBuf,
    /// Strava OAuth token file (JSON)
    #[serde(default = "default_tokens_file")]
    pub tokens_file: PathBuf,
    /// GeoJSON export destination
    #[serde(default = "default_geo_file")]
    pub geo_data_file: PathBuf,
}

/// Sync and enrichment behavior.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataConfig {
    /// Reverse-geocode start/end addresses for new activities
    #[serde(default)]
    pub reverse_geocoding: bool,
    /// Also enrich previously fetched activities
    #[serde(default)]
    pub update_existing_activities: bool,
    /// Description tag rules
    #[serde(default)]
    pub description_tags: Vec<TagRule>,
}

/// Rule for extracting a user-defined column from activity descriptions.
#[derive(Debug, Clone, Deserialize)]
pub struct TagRule {
    /// Literal marker text to search for (e.g. "Skis:")
    pub tag_name: String,
    /// Destination column in the store
    pub column_name: String,
    /// Sport types the rule applies to
    pub activity_types: Vec<String>,
}

/// Reverse-geocoding service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingConfig {
    /// Nominatim endpoint
    #[serde(default = "default_geocoding_endpoint")]
    pub endpoint: String,
    /// Minimum spacing between requests (Nominatim policy is 1 req/s)
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

fn default_activity_file() -> PathBuf {
    PathBuf::from("data/strava_activities.json")
}

fn default_tokens_file() -> PathBuf {
    PathBuf::from("data/strava_tokens.json")
}

fn default_geo_file() -> PathBuf {
    PathBuf::from("data/strava_activities.geojson")
}

fn default_geocoding_endpoint() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_min_interval_ms() -> u64 {
    1000
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            activity_data_file: default_activity_file(),
            tokens_file: default_tokens_file(),
            geo_data_file: default_geo_file(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_geocoding_endpoint(),
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read '{}': {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&raw).map_err(|e| {
            Error::Config(format!("cannot parse '{}': {}", path.display(), e))
        })?;
        validate_tag_rules(&config.data.description_tags)?;
        Ok(config)
    }
}

/// Validate the tag rule set. Called at configuration-load time so a broken
/// rule set is rejected before any fetch begins.
pub fn validate_tag_rules(rules: &[TagRule]) -> Result<()> {
    let mut seen_columns = HashSet::new();
    for rule in rules {
        if rule.tag_name.is_empty() {
            return Err(Error::EnrichmentRule(format!(
                "rule for column '{}' has an empty tag_name",
                rule.column_name
            )));
        }
        if rule.column_name.is_empty() {
            return Err(Error::EnrichmentRule(format!(
                "rule with tag '{}' has an empty column_name",
                rule.tag_name
            )));
        }
        if rule.activity_types.is_empty() {
            return Err(Error::EnrichmentRule(format!(
                "rule for column '{}' applies to no activity types",
                rule.column_name
            )));
        }
        let column = rule.column_name.as_str();
        if PROVIDER_COLUMNS.contains(&column) || DERIVED_COLUMNS.contains(&column) {
            return Err(Error::EnrichmentRule(format!(
                "column '{}' collides with a built-in field",
                rule.column_name
            )));
        }
        if !seen_columns.insert(rule.column_name.as_str()) {
            return Err(Error::EnrichmentRule(format!(
                "duplicate column '{}'",
                rule.column_name
            )));
        }
    }
    Ok(())
}

/// Strava API credentials, read from the environment.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    /// Read credentials from `STRAVA_CLIENT_ID` / `STRAVA_CLIENT_SECRET`,
    /// loading a `.env` file first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            client_id: env::var("STRAVA_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| Error::Config("STRAVA_CLIENT_ID is not set".to_string()))?,
            client_secret: env::var("STRAVA_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| Error::Config("STRAVA_CLIENT_SECRET is not set".to_string()))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(tag: &str, column: &str, types: &[&str]) -> TagRule {
        TagRule {
            tag_name: tag.to_string(),
            column_name: column.to_string(),
            activity_types: types.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [paths]
            activity_data_file = "data/activities.json"
            tokens_file = "data/tokens.json"

            [data]
            reverse_geocoding = true
            update_existing_activities = false

            [[data.description_tags]]
            tag_name = "Skis:"
            column_name = "ski_type"
            activity_types = ["AlpineSki"]

            [geocoding]
            min_interval_ms = 1500
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.data.reverse_geocoding);
        assert_eq!(config.data.description_tags.len(), 1);
        assert_eq!(config.data.description_tags[0].column_name, "ski_type");
        assert_eq!(config.geocoding.min_interval_ms, 1500);
        assert_eq!(
            config.paths.geo_data_file,
            PathBuf::from("data/strava_activities.geojson")
        );
        validate_tag_rules(&config.data.description_tags).unwrap();
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(!config.data.reverse_geocoding);
        assert!(config.data.description_tags.is_empty());
        assert_eq!(config.geocoding.min_interval_ms, 1000);
    }

    #[test]
    fn test_rule_missing_column_name_fails_fast() {
        let toml = r#"
            [[data.description_tags]]
            tag_name = "Skis:"
            activity_types = ["AlpineSki"]
        "#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_empty_tag_name_rejected() {
        let err = validate_tag_rules(&[rule("", "ski_type", &["AlpineSki"])]).unwrap_err();
        assert!(matches!(err, Error::EnrichmentRule(_)));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let rules = [
            rule("Skis:", "gear", &["AlpineSki"]),
            rule("Bike:", "gear", &["Ride"]),
        ];
        let err = validate_tag_rules(&rules).unwrap_err();
        assert!(err.to_string().contains("duplicate column 'gear'"));
    }

    #[test]
    fn test_provider_column_collision_rejected() {
        let err = validate_tag_rules(&[rule("Distance:", "distance", &["Run"])]).unwrap_err();
        assert!(err.to_string().contains("built-in field"));

        let err =
            validate_tag_rules(&[rule("Start:", "start_address", &["Run"])]).unwrap_err();
        assert!(err.to_string().contains("built-in field"));
    }
}
