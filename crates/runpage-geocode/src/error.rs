//! Error types for reverse geocoding.

use thiserror::Error;

/// Errors that can occur during a reverse-geocoding call.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Building the client, sending the request, or reading the body failed
    /// (includes timeouts and non-2xx HTTP statuses).
    #[error("geocoding request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The body was not the JSON document the provider documents.
    #[error("geocoding response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    /// The provider answered with a non-success status.
    #[error("geocoding API returned status {status:?}: {info}")]
    Api {
        /// The `status` field of the response.
        status: String,
        /// The provider's explanation (`info`).
        info: String,
        /// The provider's error code (`infocode`), when present.
        infocode: Option<String>,
    },

    /// A success response lacked a required section.
    #[error("geocoding response is missing {0}")]
    MissingField(&'static str),
}
