//! Row operations on the `activities` table.

use chrono::TimeDelta;
use rusqlite::{params, Connection, OptionalExtension, Row};
use runpage_types::{format_duration, parse_duration, ActivityRecord};

use crate::error::DbError;

const SELECT_COLUMNS: &str = "run_id, name, distance, moving_time, elapsed_time, type, \
     start_date, start_date_local, location_country, summary_polyline, \
     average_heartrate, average_speed, elevation_gain, source";

/// A row as SQLite hands it back. Rows written by older tools may carry
/// NULLs anywhere, so every column except the key is optional here.
struct StoredActivity {
    run_id: i64,
    name: Option<String>,
    distance: Option<f64>,
    moving_time: Option<String>,
    elapsed_time: Option<String>,
    activity_type: Option<String>,
    start_date: Option<String>,
    start_date_local: Option<String>,
    location_country: Option<String>,
    summary_polyline: Option<String>,
    average_heartrate: Option<f64>,
    average_speed: Option<f64>,
    elevation_gain: Option<f64>,
    source: Option<String>,
}

impl StoredActivity {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            run_id: row.get(0)?,
            name: row.get(1)?,
            distance: row.get(2)?,
            moving_time: row.get(3)?,
            elapsed_time: row.get(4)?,
            activity_type: row.get(5)?,
            start_date: row.get(6)?,
            start_date_local: row.get(7)?,
            location_country: row.get(8)?,
            summary_polyline: row.get(9)?,
            average_heartrate: row.get(10)?,
            average_speed: row.get(11)?,
            elevation_gain: row.get(12)?,
            source: row.get(13)?,
        })
    }

    fn into_record(self) -> Result<ActivityRecord, DbError> {
        let run_id = self.run_id;
        let duration = |column: &'static str, value: Option<String>| match value {
            Some(text) => parse_duration(&text).map_err(|source| DbError::CorruptDuration {
                run_id,
                column,
                source,
            }),
            None => Ok(TimeDelta::zero()),
        };

        Ok(ActivityRecord {
            run_id,
            name: self.name.unwrap_or_default(),
            distance: self.distance.unwrap_or(0.0),
            moving_time: duration("moving_time", self.moving_time)?,
            elapsed_time: duration("elapsed_time", self.elapsed_time)?,
            activity_type: self.activity_type.unwrap_or_default(),
            start_date: self.start_date.unwrap_or_default(),
            start_date_local: self.start_date_local.unwrap_or_default(),
            location_country: self.location_country,
            summary_polyline: self.summary_polyline.unwrap_or_default(),
            average_heartrate: self.average_heartrate,
            average_speed: self.average_speed.unwrap_or(0.0),
            elevation_gain: self.elevation_gain.unwrap_or(0.0),
            source: self.source.unwrap_or_default(),
            streak: None,
        })
    }
}

/// Looks up an activity by its external identifier.
///
/// # Errors
///
/// Returns `DbError::Query` on SQL failure, or `DbError::CorruptDuration`
/// if a stored duration cannot be decoded.
pub fn find_activity(conn: &Connection, run_id: i64) -> Result<Option<ActivityRecord>, DbError> {
    let stored = conn
        .query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM activities WHERE run_id = ?1"),
            [run_id],
            StoredActivity::from_row,
        )
        .optional()?;

    stored.map(StoredActivity::into_record).transpose()
}

/// Returns whether a row with `run_id` exists, without decoding it.
///
/// # Errors
///
/// Returns `DbError::Query` on SQL failure.
pub fn activity_exists(conn: &Connection, run_id: i64) -> Result<bool, DbError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM activities WHERE run_id = ?1)",
        [run_id],
        |row| row.get(0),
    )?)
}

/// Inserts a new activity row.
///
/// # Errors
///
/// Returns `DbError::Query` on SQL failure, including a duplicate `run_id`.
pub fn insert_activity(conn: &Connection, record: &ActivityRecord) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO activities (
            run_id, name, distance, moving_time, elapsed_time, type,
            start_date, start_date_local, location_country, summary_polyline,
            average_heartrate, average_speed, elevation_gain, source
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            record.run_id,
            record.name,
            record.distance,
            format_duration(record.moving_time),
            format_duration(record.elapsed_time),
            record.activity_type,
            record.start_date,
            record.start_date_local,
            record.location_country,
            record.summary_polyline,
            record.average_heartrate,
            record.average_speed,
            record.elevation_gain,
            record.source,
        ],
    )?;
    Ok(())
}

/// Overwrites the mutable fields of an existing row.
///
/// Identity, start dates and `location_country` are left as stored; the
/// corresponding fields of `record` are ignored. Returns `false` if no row
/// has `record.run_id`.
///
/// # Errors
///
/// Returns `DbError::Query` on SQL failure.
pub fn update_activity(conn: &Connection, record: &ActivityRecord) -> Result<bool, DbError> {
    let changed = conn.execute(
        "UPDATE activities SET
            name = ?2,
            distance = ?3,
            moving_time = ?4,
            elapsed_time = ?5,
            type = ?6,
            average_heartrate = ?7,
            average_speed = ?8,
            elevation_gain = ?9,
            summary_polyline = ?10,
            source = ?11
         WHERE run_id = ?1",
        params![
            record.run_id,
            record.name,
            record.distance,
            format_duration(record.moving_time),
            format_duration(record.elapsed_time),
            record.activity_type,
            record.average_heartrate,
            record.average_speed,
            record.elevation_gain,
            record.summary_polyline,
            record.source,
        ],
    )?;
    Ok(changed == 1)
}

/// Loads every activity longer than `min_distance` metres, oldest first by
/// local start time.
///
/// # Errors
///
/// Returns `DbError::Query` on SQL failure, or `DbError::CorruptDuration`
/// if a stored duration cannot be decoded.
pub fn load_activities(conn: &Connection, min_distance: f64) -> Result<Vec<ActivityRecord>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM activities
         WHERE distance > ?1
         ORDER BY start_date_local ASC, run_id ASC"
    ))?;
    let rows = stmt.query_map([min_distance], StoredActivity::from_row)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?.into_record()?);
    }
    Ok(records)
}

/// Returns the number of stored activities.
///
/// # Errors
///
/// Returns `DbError::Query` on SQL failure.
pub fn count_activities(conn: &Connection) -> Result<i64, DbError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM activities", [], |row| row.get(0))?)
}
