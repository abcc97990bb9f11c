//! Batch import and front-end export.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rusqlite::Connection;
use runpage_db::load_activities;
use runpage_geocode::ReverseGeocoder;
use runpage_types::{assign_streaks, ActivityRecord, SourceActivity};

use crate::error::SyncError;
use crate::upsert::{upsert_activity, SyncOptions, UpsertOutcome};

/// Counts from one [`import_activities`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    /// Activities whose upsert failed and were skipped.
    pub failed: usize,
    /// Created activities stored without a location after geocoding failed.
    pub unresolved_locations: usize,
}

/// Reads a JSON array of upstream activities.
///
/// # Errors
///
/// Returns `SyncError::Read` if the file cannot be read and
/// `SyncError::Parse` if it is not an array of activities.
pub fn read_activities(path: &Path) -> Result<Vec<SourceActivity>, SyncError> {
    let contents = std::fs::read(path).map_err(|source| SyncError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&contents).map_err(|source| SyncError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Upserts every activity in order.
///
/// A failing activity is logged with its `run_id` and counted; the rest of
/// the batch still runs.
pub fn import_activities(
    conn: &Connection,
    activities: &[SourceActivity],
    geocoder: Option<&dyn ReverseGeocoder>,
    options: &SyncOptions,
) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for activity in activities {
        match upsert_activity(conn, activity, geocoder, options) {
            Ok(UpsertOutcome::Created { geocode_error, .. }) => {
                summary.created += 1;
                if geocode_error.is_some() {
                    summary.unresolved_locations += 1;
                }
            }
            Ok(UpsertOutcome::Updated) => summary.updated += 1,
            Err(error) => {
                tracing::error!(run_id = activity.id, %error, "failed to upsert activity");
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        created = summary.created,
        updated = summary.updated,
        failed = summary.failed,
        unresolved_locations = summary.unresolved_locations,
        "import finished"
    );
    summary
}

/// Loads the activities to export, oldest first, with streaks assigned.
///
/// # Errors
///
/// Returns `SyncError::Db` if the rows cannot be loaded.
pub fn load_export(conn: &Connection, min_distance: f64) -> Result<Vec<ActivityRecord>, SyncError> {
    let mut records = load_activities(conn, min_distance)?;
    assign_streaks(&mut records);
    Ok(records)
}

/// Writes every activity longer than `min_distance` metres to `path` as a
/// JSON array. Returns the number of activities written.
///
/// # Errors
///
/// Returns `SyncError::Db` if the rows cannot be loaded, or
/// `SyncError::Write` if the file cannot be written.
pub fn export_activities(
    conn: &Connection,
    path: &Path,
    min_distance: f64,
) -> Result<usize, SyncError> {
    let records = load_export(conn, min_distance)?;
    let write_err = |source| SyncError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut writer = BufWriter::new(File::create(path).map_err(write_err)?);
    serde_json::to_writer(&mut writer, &records).map_err(|e| {
        if e.is_io() {
            write_err(e.into())
        } else {
            SyncError::Serialize(e)
        }
    })?;
    writer.flush().map_err(write_err)?;

    tracing::info!(count = records.len(), path = %path.display(), "exported activities");
    Ok(records.len())
}
