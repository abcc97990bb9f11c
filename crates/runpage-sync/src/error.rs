//! Error types for synchronisation.

use std::path::PathBuf;

use runpage_db::DbError;
use runpage_geocode::GeocodeError;
use thiserror::Error;

/// Errors that can occur while importing or exporting activities.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A store operation failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// The geocoding client could not be set up.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    /// An input file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An input file is not a JSON array of activities.
    #[error("invalid activity file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The export could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The export could not be serialized.
    #[error("failed to serialize activities: {0}")]
    Serialize(#[from] serde_json::Error),
}
