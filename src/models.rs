//! Data models for the measurement harvester.
//!
//! Upstream shapes (`MeasurementPage`, `PageResult`, `LocationPage`) mirror the
//! JSON the API returns, with every optional block spelled out as `Option`.
//! [`MeasurementRecord`] is the flat row handed to the output sinks.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

// ---

/// One page of daily-aggregated measurements for a sensor.
#[derive(Debug, Deserialize)]
pub struct MeasurementPage {
    // ---
    #[serde(default)]
    pub results: Vec<PageResult>,
}

/// A single aggregated period as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct PageResult {
    // ---
    pub value: Option<f64>,
    pub parameter: Parameter,
    pub period: Period,
    #[serde(default)]
    pub coverage: Option<Coverage>,
    #[serde(default)]
    pub summary: Option<Summary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    // ---
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub units: String,
}

/// Period descriptor; only the start instant is carried into records.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    // ---
    pub datetime_from: PeriodInstant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeriodInstant {
    // ---
    pub utc: DateTime<Utc>,
    pub local: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    // ---
    pub percent_complete: Option<f64>,
}

/// Intra-period statistics.
#[derive(Debug, Clone, Deserialize)]
pub struct Summary {
    // ---
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub median: Option<f64>,
}

/// Location lookup envelope.
#[derive(Debug, Deserialize)]
pub struct LocationPage {
    // ---
    #[serde(default)]
    pub results: Vec<Location>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    // ---
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sensors: Vec<SensorInfo>,
}

/// A sensor registered at a location.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorInfo {
    // ---
    pub id: i64,
    pub parameter: Parameter,
}

/// One output row.
///
/// Summary and coverage fields stay `None` when the upstream block is
/// missing; they are never defaulted to zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRecord {
    // ---
    pub sensor_id: i64,
    pub parameter: String,
    pub datetime_utc: DateTime<Utc>,
    pub datetime_local: DateTime<FixedOffset>,
    pub value: Option<f64>,
    pub units: String,
    pub coverage_percent: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub median: Option<f64>,
}

/// Flattening from the nested upstream shape
impl PageResult {
    // ---
    /// Build the output row for `sensor_id`.
    ///
    /// `parameter` overrides the name reported in the result itself; location
    /// expansion uses it to tag rows with the sensor's registered parameter.
    pub fn to_record(&self, sensor_id: i64, parameter: Option<&str>) -> MeasurementRecord {
        // ---
        let summary = self.summary.as_ref();

        MeasurementRecord {
            sensor_id,
            parameter: parameter.unwrap_or(&self.parameter.name).to_string(),
            datetime_utc: self.period.datetime_from.utc,
            datetime_local: self.period.datetime_from.local,
            value: self.value,
            units: self.parameter.units.clone(),
            coverage_percent: self.coverage.as_ref().and_then(|c| c.percent_complete),
            min: summary.and_then(|s| s.min),
            max: summary.and_then(|s| s.max),
            median: summary.and_then(|s| s.median),
        }
    }
}
