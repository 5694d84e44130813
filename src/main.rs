// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava-Mirror CLI
//!
//! Synchronizes the local activity store with Strava, enriches new records,
//! and optionally prints summary statistics or exports a GeoJSON trace file.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strava_mirror::{
    config::{Config, Credentials},
    dataset::DatasetView,
    services::{analysis, geo, NominatimGeocoder, StravaService, SyncEngine, SyncOptions},
    store::RecordStore,
};

#[derive(Debug, Parser)]
#[command(name = "strava-mirror", about = "Mirror and enrich Strava activity data locally")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Start of an explicit date range (ISO 8601 date or datetime)
    #[arg(long, value_parser = parse_utc)]
    date_range_start: Option<DateTime<Utc>>,

    /// End of an explicit date range (ISO 8601 date or datetime)
    #[arg(long, value_parser = parse_utc)]
    date_range_end: Option<DateTime<Utc>>,

    /// Export the geospatial activity data in GeoJSON format
    #[arg(short = 'g', long)]
    export_geo_data: bool,

    /// Print summary statistics per activity type
    #[arg(short = 's', long)]
    stats: bool,

    /// Skip the sync and operate on the local store only
    #[arg(long)]
    no_sync: bool,
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Run failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let (Some(start), Some(end)) = (cli.date_range_start, cli.date_range_end) {
        anyhow::ensure!(end >= start, "End date must be later than start date");
    }

    let config = Config::load(&cli.config)?;
    let mut store = RecordStore::load(&config.paths.activity_data_file)?;

    if !cli.no_sync {
        let credentials = Credentials::from_env()?;
        let provider = StravaService::new(
            credentials.client_id,
            credentials.client_secret,
            config.paths.tokens_file.clone(),
        );
        let geocoder = NominatimGeocoder::new(
            config.geocoding.endpoint.clone(),
            Duration::from_millis(config.geocoding.min_interval_ms),
        );
        let options = SyncOptions {
            range_start: cli.date_range_start,
            range_end: cli.date_range_end,
            reverse_geocoding: config.data.reverse_geocoding,
            update_existing: config.data.update_existing_activities,
            tag_rules: config.data.description_tags.clone(),
        };

        let engine = SyncEngine::new(provider, geocoder, options);
        let report = engine.run(&mut store).await?;
        tracing::info!(
            fetched = report.fetched,
            inserted = report.inserted,
            updated = report.updated,
            tagged = report.tagged,
            geocoded = report.geocoded,
            geocode_failures = report.geocode_failures,
            "Sync finished"
        );
    }

    if cli.stats {
        let view = DatasetView::from_store(&store);
        print!("{}", analysis::render_summary(&analysis::summary_statistics(&view)));
    }

    if cli.export_geo_data {
        geo::export_geojson(&store, &config.paths.geo_data_file)?;
    }

    Ok(())
}

/// Accept either a full RFC3339 datetime or a bare date (midnight UTC).
fn parse_utc(input: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(input) {
        return Ok(datetime.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(|date| date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
        .map_err(|_| format!("'{}' is not an ISO 8601 date or datetime", input))
}

fn init_logging() {
    let format = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("strava_mirror=info".parse().expect("valid directive"))
                .add_directive("info".parse().expect("valid directive")),
        )
        .with(format)
        .init();
}
