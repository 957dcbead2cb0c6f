//! Error taxonomy for the harvester.
//!
//! Each failure class maps to one policy: a bad date fails the call that
//! asked for it, a page failure stops pagination for one sensor, and an
//! output failure marks one unit of work as failed.

use thiserror::Error;

/// A human-supplied date could not be canonicalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse date '{input}': {reason}")]
pub struct DateParseError {
    // ---
    pub input: String,
    pub reason: String,
}

/// Failures talking to the upstream measurement/location API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

/// One page request for a sensor failed. Pagination for that sensor stops.
#[derive(Debug, Error)]
#[error("failed to fetch page {page} for sensor {sensor_id}: {source}")]
pub struct PageFetchError {
    // ---
    pub sensor_id: i64,
    pub page: u32,
    #[source]
    pub source: ApiError,
}

/// Persisting an aggregated table failed.
#[derive(Debug, Error)]
pub enum OutputWriteError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
