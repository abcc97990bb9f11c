//! Activity records and the upstream activity contract.

use chrono::TimeDelta;
use serde::{Deserialize, Deserializer, Serialize};

use crate::duration;

/// Source tag recorded when the upstream activity does not carry one.
pub const DEFAULT_SOURCE: &str = "gpx";

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lon: f64,
}

impl LatLng {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Map data attached to an upstream activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityMap {
    /// Encoded polyline of the route, if the provider has one.
    #[serde(default)]
    pub summary_polyline: Option<String>,
}

/// An activity as delivered by an upstream provider.
///
/// Every field a provider may omit is an `Option`; the store applies the
/// defaults (`elevation_gain = 0.0`, empty polyline, [`DEFAULT_SOURCE`]).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceActivity {
    pub id: i64,
    pub name: String,
    pub distance: f64,
    #[serde(deserialize_with = "duration::deserialize_flexible")]
    pub moving_time: TimeDelta,
    #[serde(deserialize_with = "duration::deserialize_flexible")]
    pub elapsed_time: TimeDelta,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub start_date: String,
    pub start_date_local: String,
    #[serde(default, deserialize_with = "deserialize_start_latlng")]
    pub start_latlng: Option<LatLng>,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    pub average_speed: f64,
    #[serde(default)]
    pub total_elevation_gain: Option<f64>,
    #[serde(default)]
    pub elevation_gain: Option<f64>,
    #[serde(default)]
    pub map: Option<ActivityMap>,
    #[serde(default)]
    pub location_country: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl SourceActivity {
    /// Elevation gain in metres.
    ///
    /// Strava reports `total_elevation_gain`; GPX/FIT converters report
    /// `elevation_gain`. The first one present wins, otherwise `0.0`.
    pub fn resolved_elevation_gain(&self) -> f64 {
        self.total_elevation_gain
            .or(self.elevation_gain)
            .unwrap_or(0.0)
    }

    /// Encoded route polyline, or `""` without map data.
    pub fn summary_polyline(&self) -> &str {
        self.map
            .as_ref()
            .and_then(|map| map.summary_polyline.as_deref())
            .unwrap_or("")
    }

    /// The provider's source tag, or `default` when it has none.
    pub fn source_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.source.as_deref().unwrap_or(default)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LatLngRepr {
    Pair(Vec<f64>),
    Named {
        lat: f64,
        #[serde(alias = "lng")]
        lon: f64,
    },
}

/// Accepts `[lat, lon]`, `{"lat": .., "lon": ..}`, `[]` and `null`.
fn deserialize_start_latlng<'de, D>(deserializer: D) -> Result<Option<LatLng>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<LatLngRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(LatLngRepr::Named { lat, lon }) => Ok(Some(LatLng::new(lat, lon))),
        Some(LatLngRepr::Pair(values)) => match values.as_slice() {
            [] => Ok(None),
            [lat, lon] => Ok(Some(LatLng::new(*lat, *lon))),
            other => Err(serde::de::Error::custom(format!(
                "start_latlng must hold 2 values, got {}",
                other.len()
            ))),
        },
    }
}

/// One row of the `activities` table.
///
/// Serializes to the front-end shape: `elapsed_time` is stored but not
/// exported, durations are rendered as text, and `streak` only appears once
/// the exporter has assigned one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRecord {
    pub run_id: i64,
    pub name: String,
    pub distance: f64,
    #[serde(serialize_with = "duration::serialize_text")]
    pub moving_time: TimeDelta,
    #[serde(skip_serializing)]
    pub elapsed_time: TimeDelta,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub start_date: String,
    pub start_date_local: String,
    pub location_country: Option<String>,
    pub summary_polyline: String,
    pub average_heartrate: Option<f64>,
    pub average_speed: f64,
    pub elevation_gain: f64,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
}

impl ActivityRecord {
    /// The exported JSON object for this activity.
    pub fn to_dict(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
