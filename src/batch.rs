//! Batch driver over a list of sensors or locations.
//!
//! Units are processed strictly one after another. A failure on one unit is
//! logged and counted, then the batch moves on; nothing short of an invalid
//! date range (rejected before the batch starts) stops the run.

use std::fmt;

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::api::MeasurementSource;
use crate::collector::{Collector, SensorSeries};
use crate::dates::DateRange;
use crate::models::MeasurementRecord;
use crate::sinks::Sink;

// ---

/// One unit of work, written to the sink as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkUnit {
    Sensor(i64),
    Location(i64),
}

impl WorkUnit {
    // ---
    pub fn file_name(&self) -> String {
        match self {
            WorkUnit::Sensor(id) => format!("sensor_{id}_data.csv"),
            WorkUnit::Location(id) => format!("location_{id}_data.csv"),
        }
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkUnit::Sensor(id) => write!(f, "sensor {id}"),
            WorkUnit::Location(id) => write!(f, "location {id}"),
        }
    }
}

/// Per-run tallies. Every unit lands in exactly one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    // ---
    pub run_id: Uuid,
    /// Written after reading the upstream to its end.
    pub successful: usize,
    /// Written, but pagination stopped early for at least one sensor.
    pub partial: usize,
    /// Nothing to write.
    pub empty: usize,
    /// Lookup or write failed, or nothing came back because a page failed.
    pub failed: usize,
}

impl BatchSummary {
    // ---
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            successful: 0,
            partial: 0,
            empty: 0,
            failed: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.successful + self.partial + self.empty + self.failed
    }

    pub fn log_summary(&self) {
        // ---
        info!("SUMMARY (run {})", self.run_id);
        info!("  Successful : {}", self.successful);
        info!("  Partial    : {}", self.partial);
        info!("  Empty      : {}", self.empty);
        info!("  Failed     : {}", self.failed);
        info!("  Total      : {}", self.total());
    }
}

/// What a single unit produced before it reaches the sink.
struct Harvest {
    records: Vec<MeasurementRecord>,
    complete: bool,
}

impl Harvest {
    fn from_series(all: Vec<SensorSeries>) -> Self {
        let complete = all.iter().all(SensorSeries::is_complete);
        let records = all.into_iter().flat_map(|s| s.records).collect();
        Self { records, complete }
    }
}

/// Collect and persist every unit in order.
pub async fn run<S: MeasurementSource>(
    collector: &Collector<'_, S>,
    sink: &Sink,
    units: &[WorkUnit],
    range: &DateRange,
) -> BatchSummary {
    // ---
    let run_id = Uuid::new_v4();
    let span = info_span!("batch", %run_id);

    async move {
        info!(
            "Starting batch of {} units, range {}, sink {}",
            units.len(),
            range,
            sink.describe()
        );

        let mut summary = BatchSummary::new(run_id);
        for (idx, &unit) in units.iter().enumerate() {
            info!("[{}/{}] Processing {}", idx + 1, units.len(), unit);

            let harvest = match unit {
                WorkUnit::Sensor(id) => {
                    Harvest::from_series(vec![collector.collect_range(id, range).await])
                }
                WorkUnit::Location(id) => match collector.collect_location(id, range).await {
                    Ok(all) => Harvest::from_series(all),
                    Err(e) => {
                        error!("Failed to resolve {}: {}", unit, e);
                        summary.failed += 1;
                        continue;
                    }
                },
            };

            if harvest.records.is_empty() {
                if harvest.complete {
                    warn!("No data for {}", unit);
                    summary.empty += 1;
                } else {
                    error!("No data collected for {} before a page failed", unit);
                    summary.failed += 1;
                }
                continue;
            }

            match sink.write(unit, &harvest.records).await {
                Ok(_) if harvest.complete => summary.successful += 1,
                Ok(n) => {
                    warn!("Saved {} records for {} from an incomplete fetch", n, unit);
                    summary.partial += 1;
                }
                Err(e) => {
                    error!("Failed to save {}: {}", unit, e);
                    summary.failed += 1;
                }
            }
        }

        summary.log_summary();
        summary
    }
    .instrument(span)
    .await
}
