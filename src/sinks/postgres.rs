use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::error::OutputWriteError;
use crate::models::MeasurementRecord;

/// Rows per multi-row `INSERT`.
pub const INSERT_CHUNK_ROWS: usize = 1000;

// ---

/// Appends rows to `air_quality_measurements`.
pub struct PostgresSink {
    pool: PgPool,
}

impl PostgresSink {
    // ---
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append all `records` in one transaction, [`INSERT_CHUNK_ROWS`] per statement.
    pub async fn write(&self, records: &[MeasurementRecord]) -> Result<usize, OutputWriteError> {
        // ---
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for (i, chunk) in records.chunks(INSERT_CHUNK_ROWS).enumerate() {
            insert_query(chunk).build().execute(&mut *tx).await?;
            debug!("Inserted chunk {} ({} rows)", i + 1, chunk.len());
        }
        tx.commit().await?;

        info!("Saved {} records to PostgreSQL", records.len());
        Ok(records.len())
    }
}

fn insert_query(chunk: &[MeasurementRecord]) -> QueryBuilder<'_, Postgres> {
    // ---
    let mut qb = QueryBuilder::new(
        "INSERT INTO air_quality_measurements (\
            sensor_id, parameter, datetime_utc, datetime_local, value, units, \
            coverage_percent, min_value, max_value, median_value) ",
    );

    qb.push_values(chunk, |mut row, r| {
        row.push_bind(r.sensor_id)
            .push_bind(r.parameter.as_str())
            .push_bind(r.datetime_utc)
            .push_bind(r.datetime_local)
            .push_bind(r.value)
            .push_bind(r.units.as_str())
            .push_bind(r.coverage_percent)
            .push_bind(r.min)
            .push_bind(r.max)
            .push_bind(r.median);
    });

    qb
}
