use std::collections::VecDeque;
use std::sync::Mutex;

use rusqlite::Connection;
use runpage_geocode::{GeocodeError, ReverseGeocoder};
use runpage_sync::{
    export_activities, import_activities, read_activities, upsert_activity, ImportSummary,
    SyncError, SyncOptions, UpsertOutcome,
};
use runpage_types::{LatLng, SourceActivity};
use serde_json::{json, Value};

/// Replays scripted answers and records every point it was asked about.
#[derive(Default)]
struct ScriptedGeocoder {
    answers: Mutex<VecDeque<Result<Option<String>, GeocodeError>>>,
    calls: Mutex<Vec<LatLng>>,
}

impl ScriptedGeocoder {
    fn answering(answers: Vec<Result<Option<String>, GeocodeError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<LatLng> {
        self.calls.lock().unwrap().clone()
    }
}

impl ReverseGeocoder for ScriptedGeocoder {
    fn reverse_geocode(&self, point: LatLng) -> Result<Option<String>, GeocodeError> {
        self.calls.lock().unwrap().push(point);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected geocoding call for {point:?}"))
    }
}

fn over_limit() -> GeocodeError {
    GeocodeError::Api {
        status: "0".to_string(),
        info: "CUQPS_HAS_EXCEEDED_THE_LIMIT".to_string(),
        infocode: Some("10021".to_string()),
    }
}

fn fresh_db() -> Connection {
    runpage_db::init(":memory:").unwrap()
}

fn activity(overrides: Value) -> SourceActivity {
    let mut base = json!({
        "id": 1001,
        "name": "Morning Run",
        "distance": 10012.4,
        "moving_time": 2650,
        "elapsed_time": 2790,
        "type": "running",
        "start_date": "2024-03-02 22:10:00+00:00",
        "start_date_local": "2024-03-03 06:10:00",
        "start_latlng": [30.25, 120.16],
        "average_speed": 3.78
    });
    if let (Some(base), Some(extra)) = (base.as_object_mut(), overrides.as_object()) {
        for (key, value) in extra {
            base.insert(key.clone(), value.clone());
        }
    }
    serde_json::from_value(base).unwrap()
}

fn stored_location(conn: &Connection, run_id: i64) -> Option<String> {
    conn.query_row(
        "SELECT location_country FROM activities WHERE run_id = ?1",
        [run_id],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn new_activity_is_created_with_geocoded_location() {
    let conn = fresh_db();
    let geocoder = ScriptedGeocoder::answering(vec![Ok(Some(
        "Xihu District, Hangzhou, Zhejiang, 330106, China".to_string(),
    ))]);

    let outcome = upsert_activity(
        &conn,
        &activity(json!({})),
        Some(&geocoder),
        &SyncOptions::default(),
    )
    .unwrap();

    match outcome {
        UpsertOutcome::Created {
            location,
            geocode_error,
        } => {
            assert_eq!(
                location.as_deref(),
                Some("Xihu District, Hangzhou, Zhejiang, 330106, China")
            );
            assert!(geocode_error.is_none());
        }
        other => panic!("expected Created, got {other:?}"),
    }
    assert_eq!(geocoder.calls(), vec![LatLng::new(30.25, 120.16)]);
    assert_eq!(runpage_db::count_activities(&conn).unwrap(), 1);
}

#[test]
fn created_row_applies_defaults_and_type_normalisation() {
    let conn = fresh_db();
    upsert_activity(&conn, &activity(json!({})), None, &SyncOptions::default()).unwrap();

    let record = runpage_db::find_activity(&conn, 1001).unwrap().unwrap();
    assert_eq!(record.activity_type, "Run");
    assert_eq!(record.elevation_gain, 0.0);
    assert_eq!(record.source, "gpx");
    assert_eq!(record.summary_polyline, "");
    assert_eq!(record.average_heartrate, None);
    assert_eq!(record.moving_time.num_seconds(), 2650);
}

#[test]
fn repeated_run_id_updates_without_touching_location() {
    let conn = fresh_db();
    let geocoder = ScriptedGeocoder::answering(vec![Ok(Some("Hangzhou, China".to_string()))]);
    let options = SyncOptions::default();

    upsert_activity(&conn, &activity(json!({})), Some(&geocoder), &options).unwrap();

    let renamed = activity(json!({
        "name": "Morning Run (edited)",
        "distance": 10500.0,
        "start_latlng": [31.23, 121.47],
        "location_country": "Shanghai, China",
        "total_elevation_gain": 55.0
    }));
    let outcome = upsert_activity(&conn, &renamed, Some(&geocoder), &options).unwrap();

    assert!(matches!(outcome, UpsertOutcome::Updated));
    assert_eq!(geocoder.calls().len(), 1, "updates never geocode");

    let record = runpage_db::find_activity(&conn, 1001).unwrap().unwrap();
    assert_eq!(record.name, "Morning Run (edited)");
    assert_eq!(record.distance, 10500.0);
    assert_eq!(record.elevation_gain, 55.0);
    assert_eq!(record.location_country.as_deref(), Some("Hangzhou, China"));
    assert_eq!(runpage_db::count_activities(&conn).unwrap(), 1);
}

#[test]
fn provider_location_is_kept_unless_it_is_a_refresh_sentinel() {
    let conn = fresh_db();
    let geocoder = ScriptedGeocoder::answering(vec![Ok(Some("Chaoyang, Beijing, China".to_string()))]);
    let options = SyncOptions::default();

    let specific = activity(json!({"id": 1, "location_country": "Xihu, Hangzhou, China"}));
    upsert_activity(&conn, &specific, Some(&geocoder), &options).unwrap();
    assert_eq!(stored_location(&conn, 1).as_deref(), Some("Xihu, Hangzhou, China"));
    assert!(geocoder.calls().is_empty());

    let bare_country = activity(json!({"id": 2, "location_country": "China"}));
    upsert_activity(&conn, &bare_country, Some(&geocoder), &options).unwrap();
    assert_eq!(stored_location(&conn, 2).as_deref(), Some("Chaoyang, Beijing, China"));
    assert_eq!(geocoder.calls().len(), 1);
}

#[test]
fn geocoding_is_retried_once_after_an_error() {
    let conn = fresh_db();
    let geocoder = ScriptedGeocoder::answering(vec![
        Err(over_limit()),
        Ok(Some("Hangzhou, China".to_string())),
    ]);

    let outcome = upsert_activity(
        &conn,
        &activity(json!({})),
        Some(&geocoder),
        &SyncOptions::default(),
    )
    .unwrap();

    assert!(outcome.created());
    assert_eq!(geocoder.calls().len(), 2);
    assert_eq!(stored_location(&conn, 1001).as_deref(), Some("Hangzhou, China"));
}

#[test]
fn second_geocoding_failure_stores_activity_without_location() {
    let conn = fresh_db();
    let geocoder = ScriptedGeocoder::answering(vec![
        Err(over_limit()),
        Err(GeocodeError::MissingField("regeocode.addressComponent")),
    ]);

    let outcome = upsert_activity(
        &conn,
        &activity(json!({"location_country": "China"})),
        Some(&geocoder),
        &SyncOptions::default(),
    )
    .unwrap();

    match outcome {
        UpsertOutcome::Created {
            location,
            geocode_error,
        } => {
            assert_eq!(location, None);
            assert!(matches!(
                geocode_error,
                Some(GeocodeError::MissingField(_))
            ));
        }
        other => panic!("expected Created, got {other:?}"),
    }
    assert_eq!(geocoder.calls().len(), 2, "exactly one retry");
    assert_eq!(stored_location(&conn, 1001), None);
}

#[test]
fn empty_geocoding_answer_is_not_retried() {
    let conn = fresh_db();
    let geocoder = ScriptedGeocoder::answering(vec![Ok(None)]);

    let outcome = upsert_activity(
        &conn,
        &activity(json!({})),
        Some(&geocoder),
        &SyncOptions::default(),
    )
    .unwrap();

    match outcome {
        UpsertOutcome::Created {
            location,
            geocode_error,
        } => {
            assert_eq!(location, None);
            assert!(geocode_error.is_none());
        }
        other => panic!("expected Created, got {other:?}"),
    }
    assert_eq!(geocoder.calls().len(), 1);
    assert_eq!(stored_location(&conn, 1001), None);
}

#[test]
fn no_start_point_or_no_geocoder_skips_lookup() {
    let conn = fresh_db();
    let geocoder = ScriptedGeocoder::default();
    let options = SyncOptions::default();

    let indoor = activity(json!({"id": 1, "start_latlng": []}));
    upsert_activity(&conn, &indoor, Some(&geocoder), &options).unwrap();
    assert!(geocoder.calls().is_empty());
    assert_eq!(stored_location(&conn, 1), None);

    let outdoor = activity(json!({"id": 2, "location_country": "China"}));
    upsert_activity(&conn, &outdoor, None, &options).unwrap();
    assert_eq!(stored_location(&conn, 2).as_deref(), Some("China"));
}

#[test]
fn import_counts_and_continues_past_failures() {
    let conn = fresh_db();
    conn.execute_batch(
        "CREATE TRIGGER reject_run_3 BEFORE INSERT ON activities
         WHEN NEW.run_id = 3
         BEGIN SELECT RAISE(ABORT, 'run 3 rejected'); END;",
    )
    .unwrap();
    upsert_activity(&conn, &activity(json!({"id": 2})), None, &SyncOptions::default()).unwrap();

    let geocoder = ScriptedGeocoder::answering(vec![Err(over_limit()), Err(over_limit())]);
    let batch = vec![
        activity(json!({"id": 1})),
        activity(json!({"id": 2})),
        activity(json!({"id": 3, "location_country": "Hangzhou, China"})),
        activity(json!({"id": 4, "location_country": "Hangzhou, China"})),
    ];

    let summary = import_activities(&conn, &batch, Some(&geocoder), &SyncOptions::default());
    assert_eq!(
        summary,
        ImportSummary {
            created: 2,
            updated: 1,
            failed: 1,
            unresolved_locations: 1,
        }
    );
    assert_eq!(runpage_db::count_activities(&conn).unwrap(), 3);
}

#[test]
fn reimport_repairs_a_row_with_an_unreadable_duration() {
    let conn = fresh_db();
    conn.execute(
        "INSERT INTO activities (run_id, name, distance, moving_time, elapsed_time, location_country)
         VALUES (1001, 'broken', 1000.0, 'not a duration', '0:10:00', 'Hangzhou, China')",
        [],
    )
    .unwrap();
    assert!(runpage_db::find_activity(&conn, 1001).is_err());

    let outcome =
        upsert_activity(&conn, &activity(json!({})), None, &SyncOptions::default()).unwrap();
    assert!(matches!(outcome, UpsertOutcome::Updated));

    let record = runpage_db::find_activity(&conn, 1001).unwrap().unwrap();
    assert_eq!(record.moving_time.num_seconds(), 2650);
    assert_eq!(record.location_country.as_deref(), Some("Hangzhou, China"));
}

#[test]
fn export_writes_front_end_json_with_streaks() {
    let conn = fresh_db();
    let options = SyncOptions::default();
    let batch = vec![
        activity(json!({"id": 1, "start_date_local": "2024-03-01 07:00:00", "location_country": "Hangzhou, China"})),
        activity(json!({"id": 2, "start_date_local": "2024-03-02 07:00:00"})),
        activity(json!({"id": 3, "start_date_local": "2024-03-02 19:00:00"})),
        activity(json!({"id": 4, "start_date_local": "2024-03-05 07:00:00"})),
        activity(json!({"id": 5, "start_date_local": "2024-03-06 07:00:00", "distance": 0.0})),
    ];
    import_activities(&conn, &batch, None, &options);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("static").join("activities.json");
    let written = export_activities(&conn, &path, 0.1).unwrap();
    assert_eq!(written, 4, "zero-distance activity is left out");

    let exported: Vec<Value> =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let ids: Vec<i64> = exported.iter().map(|a| a["run_id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);

    let streaks: Vec<u64> = exported.iter().map(|a| a["streak"].as_u64().unwrap()).collect();
    assert_eq!(streaks, vec![1, 2, 2, 1]);

    let first = &exported[0];
    assert_eq!(first["type"], "Run");
    assert_eq!(first["moving_time"], "0:44:10");
    assert_eq!(first["location_country"], "Hangzhou, China");
    assert_eq!(first["elevation_gain"], 0.0);
    assert!(first.get("elapsed_time").is_none());
}

#[test]
fn unreadable_input_file_is_reported_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("activities.json");

    let err = read_activities(&path).unwrap_err();
    assert!(matches!(err, SyncError::Read { .. }), "unexpected: {err:?}");

    std::fs::write(&path, r#"{"id": 1}"#).unwrap();
    let err = read_activities(&path).unwrap_err();
    assert!(matches!(err, SyncError::Parse { .. }), "unexpected: {err:?}");
}

#[test]
fn input_file_round_trips_into_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("activities.json");
    std::fs::write(
        &path,
        json!([
            {
                "id": 7,
                "name": "Lunch Ride",
                "distance": 25000.0,
                "moving_time": "1:02:05",
                "elapsed_time": "1:10:00",
                "type": "cycling",
                "start_date": "2024-03-03 04:00:00+00:00",
                "start_date_local": "2024-03-03 12:00:00",
                "start_latlng": null,
                "average_speed": 6.7,
                "elevation_gain": 120.5,
                "source": "strava"
            }
        ])
        .to_string(),
    )
    .unwrap();

    let activities = read_activities(&path).unwrap();
    let conn = fresh_db();
    let summary = import_activities(&conn, &activities, None, &SyncOptions::default());
    assert_eq!(summary.created, 1);

    let record = runpage_db::find_activity(&conn, 7).unwrap().unwrap();
    assert_eq!(record.activity_type, "Ride");
    assert_eq!(record.source, "strava");
    assert_eq!(record.elevation_gain, 120.5);
    assert_eq!(record.moving_time.num_seconds(), 3725);
}

#[cfg(target_os = "linux")]
#[test]
fn export_to_a_full_device_is_a_write_error() {
    let conn = fresh_db();
    let polyline = "_p~iF~ps|U".repeat(100);
    let batch: Vec<SourceActivity> = (1..=40)
        .map(|id| activity(json!({"id": id, "map": {"summary_polyline": polyline}})))
        .collect();
    import_activities(&conn, &batch, None, &SyncOptions::default());

    let err = export_activities(&conn, std::path::Path::new("/dev/full"), 0.1).unwrap_err();
    assert!(
        matches!(err, SyncError::Write { ref path, .. } if path.as_os_str() == "/dev/full"),
        "unexpected: {err:?}"
    );
}
