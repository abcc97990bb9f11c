//! Shared activity types for the runpage workspace.
//!
//! This crate defines the two shapes an activity takes on its way into the
//! store:
//!
//! - [`SourceActivity`]: what an upstream provider (Strava export, GPX
//!   converter, ...) hands us. Optional fields are explicit `Option`s, so a
//!   provider that never reports elevation simply leaves both elevation
//!   fields as `None`.
//! - [`ActivityRecord`]: one row of the `activities` table, and the object
//!   serialized into the front-end JSON.
//!
//! It also owns the activity type normalisation table, the duration text
//! format shared by the store and the exporter, and running-streak
//! annotation.

mod activity;
pub mod duration;
mod kind;
mod streak;

pub use activity::{ActivityMap, ActivityRecord, LatLng, SourceActivity, DEFAULT_SOURCE};
pub use duration::{format_duration, parse_duration, ParseDurationError};
pub use kind::ActivityTypeMap;
pub use streak::assign_streaks;
