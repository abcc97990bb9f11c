//! AMap (Gaode) `regeo` client.
//!
//! AMap answers `GET /v3/geocode/regeo?location=<lon>,<lat>` with an
//! `addressComponent` object. Components the provider has nothing for come
//! back as empty strings or empty arrays (`"township": []`), so every field
//! is read leniently and only non-empty strings are kept.

use std::fmt;
use std::time::Duration;

use runpage_types::LatLng;
use serde::Deserialize;
use serde_json::Value;

use crate::error::GeocodeError;
use crate::limiter::{RateLimiter, DEFAULT_MIN_INTERVAL};
use crate::ReverseGeocoder;

/// Public AMap reverse-geocoding endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://restapi.amap.com/v3/geocode/regeo";

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_min_interval_ms() -> u64 {
    DEFAULT_MIN_INTERVAL.as_millis() as u64
}

fn default_timeout_secs() -> u64 {
    5
}

/// Connection settings for the AMap endpoint.
#[derive(Clone, Deserialize)]
pub struct AmapConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Web-service key issued by the AMap console. Empty disables geocoding.
    #[serde(default)]
    pub api_key: String,
    /// Minimum spacing between requests, in milliseconds. Default: 800.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    /// Per-request timeout in seconds. Default: 5.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AmapConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            min_interval_ms: default_min_interval_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for AmapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmapConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("min_interval_ms", &self.min_interval_ms)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AmapConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Builds a rate limiter with this config's spacing.
    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(Duration::from_millis(self.min_interval_ms))
    }
}

/// Blocking AMap reverse-geocoding client.
pub struct AmapClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    limiter: RateLimiter,
}

impl fmt::Debug for AmapClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmapClient")
            .field("endpoint", &self.endpoint)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

impl AmapClient {
    /// Creates a client that spaces its requests through `limiter`.
    ///
    /// # Errors
    ///
    /// Returns `GeocodeError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &AmapConfig, limiter: RateLimiter) -> Result<Self, GeocodeError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            limiter,
        })
    }

    fn request(&self, point: LatLng) -> Result<Option<String>, GeocodeError> {
        self.limiter.acquire();

        // AMap wants "lon,lat" with at most six decimals.
        let location = format!("{:.6},{:.6}", point.lon, point.lat);
        let body = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("location", location.as_str()),
                ("extensions", "base"),
                ("batch", "false"),
                ("roadlevel", "0"),
            ])
            .send()?
            .error_for_status()?
            .bytes()?;

        parse_regeo_response(&body)
    }
}

impl ReverseGeocoder for AmapClient {
    fn reverse_geocode(&self, point: LatLng) -> Result<Option<String>, GeocodeError> {
        let result = self.request(point);
        match &result {
            Ok(location) => {
                tracing::debug!(lat = point.lat, lon = point.lon, ?location, "reverse geocoded");
            }
            Err(error) => {
                tracing::warn!(lat = point.lat, lon = point.lon, %error, "reverse geocoding failed");
            }
        }
        result
    }
}

#[derive(Debug, Deserialize)]
struct RegeoResponse {
    #[serde(default)]
    status: Value,
    #[serde(default)]
    info: Value,
    #[serde(default)]
    infocode: Value,
    #[serde(default)]
    regeocode: Option<Regeocode>,
}

#[derive(Debug, Deserialize)]
struct Regeocode {
    #[serde(rename = "addressComponent", default)]
    address_component: Option<AddressComponent>,
}

#[derive(Debug, Default, Deserialize)]
struct AddressComponent {
    #[serde(rename = "streetNumber", default)]
    street_number: Value,
    #[serde(default)]
    township: Value,
    #[serde(default)]
    district: Value,
    #[serde(default)]
    city: Value,
    #[serde(default)]
    province: Value,
    #[serde(default)]
    adcode: Value,
    #[serde(default)]
    country: Value,
}

impl AddressComponent {
    /// Joins street, township, district, city, province, adcode and country,
    /// most specific first, skipping what the provider left empty.
    fn describe(&self) -> Option<String> {
        let street = self.street_number.get("street").and_then(non_empty);
        let parts: Vec<&str> = street
            .into_iter()
            .chain(
                [
                    &self.township,
                    &self.district,
                    &self.city,
                    &self.province,
                    &self.adcode,
                    &self.country,
                ]
                .into_iter()
                .filter_map(non_empty),
            )
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

fn non_empty(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Decodes a `regeo` response body into a location string.
///
/// # Errors
///
/// Returns `GeocodeError::Decode` for a body that is not a JSON object,
/// `GeocodeError::Api` when `status` is not `"1"`, and
/// `GeocodeError::MissingField` when a success response carries no
/// `regeocode.addressComponent`.
pub fn parse_regeo_response(body: &[u8]) -> Result<Option<String>, GeocodeError> {
    let response: RegeoResponse = serde_json::from_slice(body)?;

    let status = value_text(&response.status);
    if status != "1" {
        return Err(GeocodeError::Api {
            status,
            info: value_text(&response.info),
            infocode: Some(value_text(&response.infocode)).filter(|code| !code.is_empty()),
        });
    }

    let component = response
        .regeocode
        .and_then(|regeocode| regeocode.address_component)
        .ok_or(GeocodeError::MissingField("regeocode.addressComponent"))?;

    Ok(component.describe())
}
