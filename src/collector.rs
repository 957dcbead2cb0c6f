//! Per-sensor pagination and normalization.
//!
//! [`Collector`] walks the page-numbered daily-measurement endpoint for one
//! sensor until the upstream runs dry, hands back a short page, or a request
//! fails. A failed page never discards earlier pages: the caller gets the
//! records collected so far together with a [`Termination`] saying why the
//! loop stopped.

use std::fmt;

use tracing::{debug, info, warn};

use crate::api::{MeasurementSource, PageQuery};
use crate::dates::DateRange;
use crate::error::{ApiError, DateParseError, PageFetchError};
use crate::models::MeasurementRecord;

pub const DEFAULT_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_MAX_PAGES: u32 = 100;

// ---

/// Why pagination for a sensor stopped.
#[derive(Debug)]
pub enum Termination {
    // ---
    /// A page came back empty.
    Exhausted,
    /// A page held fewer records than requested; treated as the last page.
    ShortPage,
    /// The per-sensor page cap was reached with full pages still coming.
    PageLimit,
    /// A page request failed; records from earlier pages are kept.
    Failed(PageFetchError),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exhausted => f.write_str("exhausted"),
            Termination::ShortPage => f.write_str("short page"),
            Termination::PageLimit => f.write_str("page limit reached"),
            Termination::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Everything collected for one sensor.
#[derive(Debug)]
pub struct SensorSeries {
    // ---
    pub sensor_id: i64,
    pub records: Vec<MeasurementRecord>,
    pub pages_requested: u32,
    pub termination: Termination,
}

impl SensorSeries {
    // ---
    /// `true` when the upstream was read to its natural end.
    pub fn is_complete(&self) -> bool {
        matches!(
            self.termination,
            Termination::Exhausted | Termination::ShortPage
        )
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Outcome of one page request, before it is folded into the buffer.
enum PageStep {
    Records(usize),
    Empty,
    Failed(ApiError),
}

/// Sensor Series Collector bound to one upstream handle.
pub struct Collector<'a, S> {
    // ---
    source: &'a S,
    page_size: u32,
    max_pages: u32,
}

impl<'a, S: MeasurementSource> Collector<'a, S> {
    // ---
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Records requested per page. Values below 1 are raised to 1.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Upper bound on page requests per sensor. Values below 1 are raised to 1.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Normalize the raw bounds, then collect every page for `sensor_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DateParseError`] unchanged if either bound cannot be parsed.
    /// Page failures are not errors; see [`SensorSeries::termination`].
    pub async fn collect(
        &self,
        sensor_id: i64,
        raw_from: Option<&str>,
        raw_to: Option<&str>,
    ) -> Result<SensorSeries, DateParseError> {
        // ---
        let range = DateRange::parse(raw_from, raw_to)?;
        Ok(self.collect_range(sensor_id, &range).await)
    }

    /// Collect every page for `sensor_id` within an already canonical range.
    pub async fn collect_range(&self, sensor_id: i64, range: &DateRange) -> SensorSeries {
        self.collect_series(sensor_id, range, None).await
    }

    /// Resolve a location to its sensors and collect each one in turn.
    ///
    /// Records are tagged with the parameter name the location reports for
    /// each sensor. A location with no sensors yields no series.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the location lookup. Page failures for
    /// individual sensors are reported in their series instead.
    pub async fn collect_location(
        &self,
        location_id: i64,
        range: &DateRange,
    ) -> Result<Vec<SensorSeries>, ApiError> {
        // ---
        info!("Fetching location {}...", location_id);
        let sensors = self.source.location_sensors(location_id).await?;
        info!("Found {} sensors at location {}", sensors.len(), location_id);

        let mut all = Vec::with_capacity(sensors.len());
        for sensor in &sensors {
            info!(
                "Fetching data for sensor {} ({})...",
                sensor.id, sensor.parameter.name
            );
            let series = self
                .collect_series(sensor.id, range, Some(&sensor.parameter.name))
                .await;
            all.push(series);
        }

        Ok(all)
    }

    async fn collect_series(
        &self,
        sensor_id: i64,
        range: &DateRange,
        parameter: Option<&str>,
    ) -> SensorSeries {
        // ---
        let mut records = Vec::new();
        let mut page: u32 = 1;

        let termination = loop {
            if page > self.max_pages {
                warn!(
                    "Sensor {}: hit page limit of {}, stopping with {} records",
                    sensor_id,
                    self.max_pages,
                    records.len()
                );
                break Termination::PageLimit;
            }

            let query = PageQuery {
                sensor_id,
                range,
                limit: self.page_size,
                page,
            };

            let step = match self.source.fetch_page(query).await {
                Ok(results) if results.is_empty() => PageStep::Empty,
                Ok(results) => {
                    records.extend(results.iter().map(|r| r.to_record(sensor_id, parameter)));
                    PageStep::Records(results.len())
                }
                Err(e) => PageStep::Failed(e),
            };

            match step {
                PageStep::Empty => {
                    debug!("Sensor {}: page {} empty", sensor_id, page);
                    break Termination::Exhausted;
                }
                PageStep::Failed(source) => {
                    let err = PageFetchError {
                        sensor_id,
                        page,
                        source,
                    };
                    warn!("Sensor {}: {}; keeping {} records", sensor_id, err, records.len());
                    break Termination::Failed(err);
                }
                PageStep::Records(n) => {
                    info!("  Page {}: {} records", page, n);
                    if n < self.page_size as usize {
                        break Termination::ShortPage;
                    }
                    page += 1;
                }
            }
        };

        let pages_requested = match termination {
            Termination::PageLimit => self.max_pages,
            _ => page,
        };

        info!(
            "Collected {} records for sensor {} ({})",
            records.len(),
            sensor_id,
            termination
        );

        SensorSeries {
            sensor_id,
            records,
            pages_requested,
            termination,
        }
    }
}
