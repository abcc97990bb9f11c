//! Error types for the database layer.

use runpage_types::ParseDurationError;
use thiserror::Error;

/// Errors that can occur while opening, migrating, or querying the store.
#[derive(Debug, Error)]
pub enum DbError {
    /// The database file could not be opened or created.
    #[error("failed to open database at {path}: {source}")]
    Open {
        /// Path that was passed to [`crate::init`].
        path: String,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// A connection pragma was rejected.
    #[error("failed to configure connection: {0}")]
    Configure(String),

    /// Creating or extending a table failed.
    #[error("schema migration of table '{table}' failed: {source}")]
    Schema {
        /// The table being migrated.
        table: String,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// A query or statement failed.
    #[error("database query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// A stored duration could not be decoded.
    #[error("activity {run_id} has an unreadable {column}: {source}")]
    CorruptDuration {
        /// The activity whose row is affected.
        run_id: i64,
        /// The offending column.
        column: &'static str,
        /// The parse failure.
        source: ParseDurationError,
    },
}
