//! Library gateway for `openaq-harvest`.
//!
//! Fetches daily air-quality measurements sensor by sensor, walking the
//! upstream's numbered pages, and flattens them into [`MeasurementRecord`]
//! rows for a CSV or Postgres sink. Each module owns one concern; callers go
//! through the re-exports below rather than reaching into modules.

pub mod api;
pub mod batch;
pub mod collector;
pub mod config;
pub mod dates;
pub mod error;
pub mod models;
pub mod schema;
pub mod sinks;

#[cfg(test)]
mod testing;

pub use api::{MeasurementSource, OpenAqClient, PageQuery};
pub use batch::{BatchSummary, WorkUnit};
pub use collector::{Collector, SensorSeries, Termination};
pub use config::Config;
pub use dates::{normalize, normalize_str, CanonicalTimestamp, DateInput, DateRange};
pub use error::{ApiError, DateParseError, OutputWriteError, PageFetchError};
pub use models::{MeasurementRecord, PageResult, SensorInfo};
pub use sinks::{CsvSink, PostgresSink, Sink};
