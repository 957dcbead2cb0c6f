//! Access to the upstream measurement and location API.
//!
//! [`MeasurementSource`] is the seam the collector depends on; [`OpenAqClient`]
//! is the HTTP implementation. The client is built once from configuration and
//! passed by reference to whatever needs it, so there is no process-wide
//! session.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::dates::DateRange;
use crate::error::ApiError;
use crate::models::{LocationPage, MeasurementPage, PageResult, SensorInfo};

pub const DEFAULT_BASE_URL: &str = "https://api.openaq.org/v3/";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-api-key";

// ---

/// Parameters for one page of daily measurements.
#[derive(Debug, Clone, Copy)]
pub struct PageQuery<'a> {
    // ---
    pub sensor_id: i64,
    pub range: &'a DateRange,
    pub limit: u32,
    /// 1-indexed.
    pub page: u32,
}

/// Upstream data access used by the collector.
pub trait MeasurementSource {
    // ---
    /// Fetch one page of daily-aggregated measurements.
    fn fetch_page(
        &self,
        query: PageQuery<'_>,
    ) -> impl Future<Output = Result<Vec<PageResult>, ApiError>> + Send;

    /// List the sensors registered at a location.
    fn location_sensors(
        &self,
        location_id: i64,
    ) -> impl Future<Output = Result<Vec<SensorInfo>, ApiError>> + Send;
}

/// HTTP client for the measurement API.
#[derive(Debug, Clone)]
pub struct OpenAqClient {
    // ---
    client: Client,
    base_url: Url,
}

impl OpenAqClient {
    // ---
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// See [`OpenAqClient::with_base_url`].
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (tests point this at wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidConfig`] if the API key is not a valid header
    /// value or `base_url` does not parse, and [`ApiError::Http`] if the
    /// underlying `reqwest::Client` cannot be built.
    pub fn with_base_url(api_key: &str, timeout_secs: u64, base_url: &str) -> Result<Self, ApiError> {
        // ---
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| ApiError::InvalidConfig(format!("API key is not a valid header: {e}")))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("openaq-harvest/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        // Exactly one trailing slash, so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| ApiError::InvalidConfig(format!("invalid base URL '{base_url}': {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL for one page of a sensor's daily aggregates.
    fn measurements_url(&self, query: &PageQuery<'_>) -> Result<Url, ApiError> {
        // ---
        let mut url = self.join(&format!("sensors/{}/days", query.sensor_id))?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(from) = query.range.from() {
                pairs.append_pair("datetime_from", from.as_str());
            }
            if let Some(to) = query.range.to() {
                pairs.append_pair("datetime_to", to.as_str());
            }
            pairs.append_pair("limit", &query.limit.to_string());
            pairs.append_pair("page", &query.page.to_string());
        }
        Ok(url)
    }

    fn join(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidConfig(format!("cannot build URL for '{path}': {e}")))
    }

    /// GET `url`, require a 2xx status, and decode the body as `T`.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        // ---
        tracing::debug!("GET {}", url);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Deserialize {
            context: url.path().to_string(),
            source: e,
        })
    }
}

impl MeasurementSource for OpenAqClient {
    // ---
    async fn fetch_page(&self, query: PageQuery<'_>) -> Result<Vec<PageResult>, ApiError> {
        let url = self.measurements_url(&query)?;
        let page: MeasurementPage = self.get_json(url).await?;
        Ok(page.results)
    }

    async fn location_sensors(&self, location_id: i64) -> Result<Vec<SensorInfo>, ApiError> {
        // ---
        let url = self.join(&format!("locations/{location_id}"))?;
        let page: LocationPage = self.get_json(url).await?;

        page.results
            .into_iter()
            .next()
            .map(|location| location.sensors)
            .ok_or_else(|| ApiError::NotFound(format!("location {location_id}")))
    }
}
