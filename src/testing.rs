//! In-memory upstream for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use chrono::{Duration, TimeZone, Utc};

use crate::api::{MeasurementSource, PageQuery};
use crate::error::ApiError;
use crate::models::{PageResult, Parameter, Period, PeriodInstant, SensorInfo, Summary};

/// Replays a script of page responses: `Ok(n)` serves `n` results, `Err(status)`
/// fails the request with that HTTP status. An exhausted script serves empty
/// pages.
pub(crate) struct ScriptedSource {
    pages: Mutex<VecDeque<Result<usize, u16>>>,
    requests: AtomicU32,
    pub(crate) seen_pages: Mutex<Vec<u32>>,
    pub(crate) sensors: Vec<SensorInfo>,
    pub(crate) missing_location: bool,
}

impl ScriptedSource {
    pub(crate) fn new(script: Vec<Result<usize, u16>>) -> Self {
        Self {
            pages: Mutex::new(script.into()),
            requests: AtomicU32::new(0),
            seen_pages: Mutex::new(Vec::new()),
            sensors: Vec::new(),
            missing_location: false,
        }
    }

    pub(crate) fn requests(&self) -> u32 {
        self.requests.load(Ordering::SeqCst)
    }
}

impl MeasurementSource for ScriptedSource {
    async fn fetch_page(&self, query: PageQuery<'_>) -> Result<Vec<PageResult>, ApiError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.seen_pages.lock().unwrap().push(query.page);

        let next = self.pages.lock().unwrap().pop_front().unwrap_or(Ok(0));
        match next {
            Ok(n) => Ok((0..n).map(|i| result_at(query.page, i)).collect()),
            Err(status) => Err(ApiError::Status {
                status,
                body: "upstream unavailable".to_string(),
            }),
        }
    }

    async fn location_sensors(&self, location_id: i64) -> Result<Vec<SensorInfo>, ApiError> {
        if self.missing_location {
            return Err(ApiError::NotFound(format!("location {location_id}")));
        }
        Ok(self.sensors.clone())
    }
}

/// A distinct daily result for each (page, index) pair.
pub(crate) fn result_at(page: u32, i: usize) -> PageResult {
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
        + Duration::days(i64::from(page) * 10_000 + i as i64);
    PageResult {
        value: Some(i as f64),
        parameter: pm25(),
        period: Period {
            datetime_from: PeriodInstant {
                utc: start,
                local: start.fixed_offset(),
            },
        },
        coverage: None,
        summary: Some(Summary {
            min: Some(0.0),
            max: Some(1.0),
            median: None,
        }),
    }
}

pub(crate) fn pm25() -> Parameter {
    Parameter {
        id: Some(2),
        name: "pm25".to_string(),
        units: "µg/m³".to_string(),
    }
}

pub(crate) fn sensor(id: i64, name: &str, units: &str) -> SensorInfo {
    SensorInfo {
        id,
        parameter: Parameter {
            id: None,
            name: name.to_string(),
            units: units.to_string(),
        },
    }
}
