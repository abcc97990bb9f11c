//! runpage-sync binary: imports upstream activities into the SQLite store
//! and writes the front-end activity JSON.

use std::path::Path;
use std::process::ExitCode;

use runpage_db::DbRuntimeSettings;
use runpage_geocode::{AmapClient, ReverseGeocoder};
use runpage_sync::config::{self, Config};
use runpage_sync::{export_activities, import_activities, read_activities, SyncError};
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("RUNPAGE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

fn main() -> ExitCode {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    let config = match config::load_config(selected_config_path) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("runpage-sync: {error}");
            return ExitCode::FAILURE;
        }
    };

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "sync failed");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<(), SyncError> {
    let conn = runpage_db::init_with_settings(
        &config.database.path,
        DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
        },
    )?;

    if let Some(input) = &config.import.input {
        let client = if config.geocoding_enabled() {
            let amap = &config.geocode.amap;
            Some(AmapClient::new(amap, amap.rate_limiter())?)
        } else {
            tracing::warn!("no AMap API key configured, new activities keep their given location");
            None
        };

        let activities = read_activities(Path::new(input))?;
        tracing::info!(count = activities.len(), path = %input, "read activities");

        let geocoder = client.as_ref().map(|c| c as &dyn ReverseGeocoder);
        let summary = import_activities(&conn, &activities, geocoder, &config.sync_options());
        if summary.failed > 0 {
            tracing::warn!(failed = summary.failed, "some activities were not imported");
        }
    }

    export_activities(
        &conn,
        Path::new(&config.import.output),
        config.import.min_export_distance,
    )?;
    Ok(())
}
