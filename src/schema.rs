//! Database schema management for `openaq-harvest`.
//!
//! Ensures the measurements table and its index exist before any rows are
//! appended. Applied once from `main.rs` when the Postgres sink is selected.

use sqlx::PgPool;

// ---

/// Create the measurements table if missing (idempotent).
///
/// Summary statistics land in `min_value`, `max_value` and `median_value`.
/// Safe to call on every startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS air_quality_measurements (
            id                BIGSERIAL PRIMARY KEY,
            sensor_id         BIGINT           NOT NULL,
            parameter         TEXT             NOT NULL,
            datetime_utc      TIMESTAMPTZ      NOT NULL,
            datetime_local    TIMESTAMPTZ      NOT NULL,
            value             DOUBLE PRECISION,
            units             TEXT             NOT NULL,
            coverage_percent  DOUBLE PRECISION,
            min_value         DOUBLE PRECISION,
            max_value         DOUBLE PRECISION,
            median_value      DOUBLE PRECISION
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_air_quality_measurements_sensor_time
            ON air_quality_measurements (sensor_id, datetime_utc);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
