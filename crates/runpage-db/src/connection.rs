//! Connection opening and configuration.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};

use crate::error::DbError;
use crate::schema::{migrate_table, ACTIVITIES_TABLE};

/// Runtime tunables for the SQLite connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// Busy timeout for the connection, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
        }
    }
}

/// Opens the activity store at `path` with default settings and brings its
/// schema up to date.
///
/// Use `:memory:` for an in-memory database (useful for testing).
///
/// # Errors
///
/// Returns `DbError::Open` if the file cannot be opened or created, and
/// `DbError::Schema` if the `activities` table cannot be created or extended.
pub fn init(path: impl AsRef<Path>) -> Result<Connection, DbError> {
    init_with_settings(path, DbRuntimeSettings::default())
}

/// Like [`init`], with explicit connection settings.
///
/// # Errors
///
/// See [`init`].
pub fn init_with_settings(
    path: impl AsRef<Path>,
    settings: DbRuntimeSettings,
) -> Result<Connection, DbError> {
    let conn = open_connection(path.as_ref(), settings)?;

    let added = migrate_table(&conn, &ACTIVITIES_TABLE)?;
    if !added.is_empty() {
        tracing::info!(
            table = ACTIVITIES_TABLE.name,
            columns = ?added,
            "added missing columns"
        );
    }

    Ok(conn)
}

/// Opens a connection in WAL mode without touching the schema.
///
/// # Errors
///
/// Returns `DbError::Open` if SQLite cannot open the file, or
/// `DbError::Configure` if WAL mode or the busy timeout is rejected.
pub fn open_connection(path: &Path, settings: DbRuntimeSettings) -> Result<Connection, DbError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;

    let conn = Connection::open_with_flags(path, flags).map_err(|source| DbError::Open {
        path: path.display().to_string(),
        source,
    })?;

    // In-memory databases report "memory", which is expected and acceptable.
    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
        .map_err(|e| DbError::Configure(e.to_string()))?;
    if journal_mode != "wal" && journal_mode != "memory" {
        return Err(DbError::Configure(format!(
            "failed to set WAL journal mode, got: {journal_mode}"
        )));
    }

    conn.execute_batch(&format!(
        "PRAGMA busy_timeout = {};",
        settings.busy_timeout_ms
    ))
    .map_err(|e| DbError::Configure(e.to_string()))?;

    tracing::debug!(path = %path.display(), "opened activity store");

    Ok(conn)
}
