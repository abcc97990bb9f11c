//! Create-or-update of a single activity.

use rusqlite::Connection;
use runpage_db::{activity_exists, insert_activity, update_activity};
use runpage_geocode::{GeocodeError, ReverseGeocoder};
use runpage_types::{ActivityRecord, ActivityTypeMap, SourceActivity, DEFAULT_SOURCE};

use crate::error::SyncError;

/// Policy knobs for [`upsert_activity`].
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Normalisation applied to the upstream activity type.
    pub type_map: ActivityTypeMap,
    /// Source tag for activities that do not carry one.
    pub default_source: String,
    /// Provider-supplied locations that are re-resolved anyway. Some
    /// providers report a bare country for every activity; listing it here
    /// replaces it with the geocoded address.
    pub refresh_locations: Vec<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            type_map: ActivityTypeMap::default(),
            default_source: DEFAULT_SOURCE.to_string(),
            refresh_locations: vec!["China".to_string()],
        }
    }
}

impl SyncOptions {
    fn needs_geocoding(&self, location: Option<&str>) -> bool {
        match location.map(str::trim) {
            None | Some("") => true,
            Some(given) => self.refresh_locations.iter().any(|l| l == given),
        }
    }
}

/// What [`upsert_activity`] did.
#[derive(Debug)]
pub enum UpsertOutcome {
    /// A new row was inserted.
    Created {
        /// The stored `location_country`.
        location: Option<String>,
        /// Set when both geocoding attempts failed; the row was still
        /// created, without a location.
        geocode_error: Option<GeocodeError>,
    },
    /// An existing row had its mutable fields refreshed.
    Updated,
}

impl UpsertOutcome {
    pub fn created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// Inserts `activity` if its `run_id` is new, otherwise refreshes the
/// stored row.
///
/// On creation the location is resolved at most once per import: the
/// provider's `location_country` is kept unless it is empty or listed in
/// [`SyncOptions::refresh_locations`], in which case `geocoder` is asked
/// (one retry on error). On update `location_country` is never touched, so
/// an activity is geocoded only the first time it is seen.
///
/// # Errors
///
/// Returns `SyncError::Db` if the lookup, insert, or update fails. Geocoding
/// failures never fail the upsert; they are reported in the outcome.
pub fn upsert_activity(
    conn: &Connection,
    activity: &SourceActivity,
    geocoder: Option<&dyn ReverseGeocoder>,
    options: &SyncOptions,
) -> Result<UpsertOutcome, SyncError> {
    let mut record = to_record(activity, options);

    // Only existence matters: an update rewrites every column that could be
    // unreadable, so a damaged row is repaired by re-importing it.
    if activity_exists(conn, activity.id)? {
        update_activity(conn, &record)?;
        tracing::debug!(run_id = activity.id, "updated activity");
        return Ok(UpsertOutcome::Updated);
    }

    let (location, geocode_error) = resolve_location(activity, geocoder, options);
    record.location_country = location.clone();
    insert_activity(conn, &record)?;

    tracing::info!(
        run_id = activity.id,
        location = location.as_deref().unwrap_or("<none>"),
        "created activity"
    );
    Ok(UpsertOutcome::Created {
        location,
        geocode_error,
    })
}

fn to_record(activity: &SourceActivity, options: &SyncOptions) -> ActivityRecord {
    ActivityRecord {
        run_id: activity.id,
        name: activity.name.clone(),
        distance: activity.distance,
        moving_time: activity.moving_time,
        elapsed_time: activity.elapsed_time,
        activity_type: options
            .type_map
            .normalize(&activity.activity_type)
            .to_string(),
        start_date: activity.start_date.clone(),
        start_date_local: activity.start_date_local.clone(),
        location_country: None,
        summary_polyline: activity.summary_polyline().to_string(),
        average_heartrate: activity.average_heartrate,
        average_speed: activity.average_speed,
        elevation_gain: activity.resolved_elevation_gain(),
        source: activity.source_or(&options.default_source).to_string(),
        streak: None,
    }
}

fn resolve_location(
    activity: &SourceActivity,
    geocoder: Option<&dyn ReverseGeocoder>,
    options: &SyncOptions,
) -> (Option<String>, Option<GeocodeError>) {
    let given = activity
        .location_country
        .as_deref()
        .filter(|l| !l.trim().is_empty());

    if !options.needs_geocoding(given) {
        return (given.map(str::to_string), None);
    }

    let (Some(point), Some(geocoder)) = (activity.start_latlng, geocoder) else {
        return (given.map(str::to_string), None);
    };

    match geocoder.reverse_geocode(point) {
        Ok(location) => (location, None),
        Err(first) => {
            tracing::debug!(run_id = activity.id, error = %first, "retrying reverse geocoding");
            match geocoder.reverse_geocode(point) {
                Ok(location) => (location, None),
                Err(second) => {
                    tracing::warn!(
                        run_id = activity.id,
                        error = %second,
                        "reverse geocoding failed twice, storing activity without location"
                    );
                    (None, Some(second))
                }
            }
        }
    }
}
