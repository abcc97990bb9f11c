//! Activity type normalisation.

use std::collections::HashMap;

/// Upstream type names and the canonical names the front end groups by.
const BUILTIN_TYPES: &[(&str, &str)] = &[
    ("running", "Run"),
    ("RUN", "Run"),
    ("Run", "Run"),
    ("track_running", "Run"),
    ("trail_running", "Trail Run"),
    ("cycling", "Ride"),
    ("CYCLING", "Ride"),
    ("Ride", "Ride"),
    ("VirtualRide", "VirtualRide"),
    ("indoor_cycling", "Indoor Ride"),
    ("walking", "Walk"),
    ("Walk", "Walk"),
    ("hiking", "Hike"),
    ("Hike", "Hike"),
    ("Swim", "Swim"),
    ("rowing", "Rowing"),
    ("RoadTrip", "RoadTrip"),
    ("flight", "Flight"),
    ("kayaking", "Kayaking"),
    ("Snowboard", "Snowboard"),
    ("Ski", "Ski"),
];

/// Maps provider-specific activity type names onto canonical ones.
///
/// Names without an entry pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityTypeMap {
    aliases: HashMap<String, String>,
}

impl Default for ActivityTypeMap {
    fn default() -> Self {
        Self {
            aliases: BUILTIN_TYPES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}

impl ActivityTypeMap {
    /// Adds or replaces entries on top of the built-in table.
    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (from, to) in overrides {
            self.aliases.insert(from.into(), to.into());
        }
        self
    }

    /// Returns the canonical name for `raw`.
    pub fn normalize<'a>(&'a self, raw: &'a str) -> &'a str {
        self.aliases.get(raw).map(String::as_str).unwrap_or(raw)
    }
}
