//! Output sinks for collected measurement tables.
//!
//! Each unit of work (one sensor or one location) is written as a whole once
//! collection for it has finished. The batch driver only talks to [`Sink`].

use crate::batch::WorkUnit;
use crate::error::OutputWriteError;
use crate::models::MeasurementRecord;

mod csv_file;
mod postgres;

pub use csv_file::CsvSink;
pub use postgres::{PostgresSink, INSERT_CHUNK_ROWS};

// ---

/// Where aggregated records end up.
pub enum Sink {
    Csv(CsvSink),
    Postgres(PostgresSink),
}

impl Sink {
    // ---
    /// Persist `records` for `unit`, returning the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns [`OutputWriteError`] if the file or database write fails.
    pub async fn write(
        &self,
        unit: WorkUnit,
        records: &[MeasurementRecord],
    ) -> Result<usize, OutputWriteError> {
        // ---
        match self {
            Sink::Csv(sink) => sink.write(unit, records),
            Sink::Postgres(sink) => sink.write(records).await,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Sink::Csv(sink) => format!("csv ({})", sink.out_dir().display()),
            Sink::Postgres(_) => "postgres".to_string(),
        }
    }
}
