//! Reverse geocoding for newly imported activities.
//!
//! The store records a human-readable location for every activity the first
//! time it is seen. This crate turns the activity's start coordinate into
//! that string using the AMap (Gaode) `regeo` endpoint.
//!
//! Requests are spaced by an explicit [`RateLimiter`] that the caller
//! creates and injects, so several clients (or tests) can share one budget
//! without any process-wide state. Every failure is returned as a
//! [`GeocodeError`]; whether a failure is worth a retry or a log line is up
//! to the caller.

mod amap;
mod error;
mod limiter;

pub use amap::{parse_regeo_response, AmapClient, AmapConfig, DEFAULT_ENDPOINT};
pub use error::GeocodeError;
pub use limiter::{RateLimiter, DEFAULT_MIN_INTERVAL};

use runpage_types::LatLng;

/// Resolves a coordinate into a location description.
pub trait ReverseGeocoder {
    /// Returns the location string for `point`, or `Ok(None)` when the
    /// provider knows nothing about it.
    fn reverse_geocode(&self, point: LatLng) -> Result<Option<String>, GeocodeError>;
}
