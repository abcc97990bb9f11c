//! Importer configuration loading from file and environment variables.

use std::collections::HashMap;

use runpage_geocode::AmapConfig;
use runpage_types::{ActivityTypeMap, DEFAULT_SOURCE};
use serde::Deserialize;
use thiserror::Error;

use crate::upsert::SyncOptions;

/// Top-level importer configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Reverse-geocoding settings.
    #[serde(default)]
    pub geocode: GeocodeConfig,

    /// Input and export settings.
    #[serde(default)]
    pub import: ImportConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Reverse-geocoding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeConfig {
    #[serde(flatten)]
    pub amap: AmapConfig,

    /// Provider locations that are geocoded again on creation.
    #[serde(default = "default_refresh_locations")]
    pub refresh_locations: Vec<String>,
}

/// Input and export configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// JSON array of upstream activities. Nothing is imported when unset.
    #[serde(default)]
    pub input: Option<String>,

    /// Where the front-end JSON is written.
    #[serde(default = "default_output")]
    pub output: String,

    /// Source tag for activities that carry none.
    #[serde(default = "default_source")]
    pub default_source: String,

    /// Activities this short (metres) or shorter are left out of the export.
    #[serde(default = "default_min_export_distance")]
    pub min_export_distance: f64,

    /// Extra activity type aliases, applied over the built-in table.
    #[serde(default)]
    pub type_aliases: HashMap<String, String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "runpage_sync=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_db_path() -> String {
    "run_page/data.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_refresh_locations() -> Vec<String> {
    vec!["China".to_string()]
}

fn default_output() -> String {
    "src/static/activities.json".to_string()
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

fn default_min_export_distance() -> f64 {
    0.1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            amap: AmapConfig::default(),
            refresh_locations: default_refresh_locations(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: default_output(),
            default_source: default_source(),
            min_export_distance: default_min_export_distance(),
            type_aliases: HashMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Upsert policy derived from the `[import]` and `[geocode]` sections.
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            type_map: ActivityTypeMap::default().with_overrides(
                self.import
                    .type_aliases
                    .iter()
                    .map(|(from, to)| (from.clone(), to.clone())),
            ),
            default_source: self.import.default_source.clone(),
            refresh_locations: self.geocode.refresh_locations.clone(),
        }
    }

    /// Whether an API key is configured.
    pub fn geocoding_enabled(&self) -> bool {
        !self.geocode.amap.api_key.trim().is_empty()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `RUNPAGE_DB_PATH` overrides `database.path`
/// - `RUNPAGE_AMAP_KEY` overrides `geocode.api_key`
/// - `RUNPAGE_LOG_LEVEL` overrides `logging.level`
/// - `RUNPAGE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(db_path) = var("RUNPAGE_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(key) = var("RUNPAGE_AMAP_KEY") {
        config.geocode.amap.api_key = key;
    }
    if let Some(level) = var("RUNPAGE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("RUNPAGE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
