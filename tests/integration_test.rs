//! End-to-end tests for `OpenAqClient` + `Collector` over HTTP.
//!
//! A `wiremock` server stands in for the measurement API, so no real network
//! traffic is made. Each mock is mounted with an exact `expect` count, which
//! the server verifies on drop; that is how page-request counts are asserted.

use anyhow::Result;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use openaq_harvest::{ApiError, Collector, DateRange, OpenAqClient, Termination};

const SENSOR_PATH: &str = "/v3/sensors/1671/days";

fn test_client(server: &MockServer) -> OpenAqClient {
    OpenAqClient::with_base_url("test-key", 5, &format!("{}/v3", server.uri()))
        .expect("failed to build test client")
}

fn range() -> DateRange {
    DateRange::parse(Some("1/1/2023"), Some("12/31/2023")).expect("valid range")
}

/// `n` daily results starting at `first_day` days after 2023-01-01.
fn results(first_day: i64, n: i64) -> Value {
    // ---
    let items: Vec<Value> = (first_day..first_day + n)
        .map(|d| {
            let day = chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + chrono::Duration::days(d);
            json!({
                "value": d as f64 + 0.5,
                "parameter": { "id": 2, "name": "pm25", "units": "µg/m³", "displayName": null },
                "period": {
                    "label": "1 day",
                    "interval": "24:00:00",
                    "datetimeFrom": {
                        "utc": format!("{day}T08:00:00Z"),
                        "local": format!("{day}T00:00:00-08:00")
                    },
                    "datetimeTo": {
                        "utc": format!("{day}T08:00:00Z"),
                        "local": format!("{day}T00:00:00-08:00")
                    }
                },
                "coordinates": null,
                "summary": { "min": 1.0, "max": 9.0, "median": 4.0 },
                "coverage": { "expectedCount": 24, "observedCount": 24, "percentComplete": 100.0 }
            })
        })
        .collect();

    json!({ "meta": { "name": "openaq-api", "page": 1, "limit": 3, "found": n }, "results": items })
}

async fn mount_page(server: &MockServer, page: u32, status: u16, body: Value) {
    // ---
    Mock::given(method("GET"))
        .and(path(SENSOR_PATH))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn full_pages_are_followed_until_an_empty_page() -> Result<()> {
    // ---
    let server = MockServer::start().await;
    mount_page(&server, 1, 200, results(0, 3)).await;
    mount_page(&server, 2, 200, results(3, 3)).await;
    mount_page(&server, 3, 200, json!({ "results": [] })).await;

    let client = test_client(&server);
    let series = Collector::new(&client)
        .with_page_size(3)
        .collect_range(1671, &range())
        .await;

    assert_eq!(series.records.len(), 6);
    assert_eq!(series.pages_requested, 3);
    assert!(matches!(series.termination, Termination::Exhausted));
    Ok(())
}

#[tokio::test]
async fn short_page_ends_pagination() -> Result<()> {
    // ---
    let server = MockServer::start().await;
    mount_page(&server, 1, 200, results(0, 3)).await;
    mount_page(&server, 2, 200, results(3, 1)).await;

    let client = test_client(&server);
    let series = Collector::new(&client)
        .with_page_size(3)
        .collect_range(1671, &range())
        .await;

    assert_eq!(series.records.len(), 4);
    assert!(matches!(series.termination, Termination::ShortPage));
    Ok(())
}

#[tokio::test]
async fn server_error_keeps_earlier_pages() -> Result<()> {
    // ---
    let server = MockServer::start().await;
    mount_page(&server, 1, 200, results(0, 3)).await;
    mount_page(&server, 2, 503, json!({ "detail": "try later" })).await;

    let client = test_client(&server);
    let series = Collector::new(&client)
        .with_page_size(3)
        .collect_range(1671, &range())
        .await;

    assert_eq!(series.records.len(), 3);
    assert!(!series.is_complete());
    match &series.termination {
        Termination::Failed(e) => {
            assert_eq!(e.page, 2);
            assert!(matches!(e.source, ApiError::Status { status: 503, .. }));
        }
        other => panic!("expected a failed termination, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn malformed_page_is_a_page_failure() -> Result<()> {
    // ---
    let server = MockServer::start().await;
    mount_page(&server, 1, 200, results(0, 3)).await;
    mount_page(&server, 2, 200, json!({ "results": [{ "value": "oops" }] })).await;

    let client = test_client(&server);
    let series = Collector::new(&client)
        .with_page_size(3)
        .collect_range(1671, &range())
        .await;

    assert_eq!(series.records.len(), 3);
    match &series.termination {
        Termination::Failed(e) => assert!(matches!(e.source, ApiError::Deserialize { .. })),
        other => panic!("expected a failed termination, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn sensor_without_data_is_empty() -> Result<()> {
    // ---
    let server = MockServer::start().await;
    mount_page(&server, 1, 200, json!({ "meta": {}, "results": [] })).await;

    let client = test_client(&server);
    let series = Collector::new(&client).collect_range(1671, &range()).await;

    assert!(series.is_empty());
    assert!(series.is_complete());
    Ok(())
}

#[tokio::test]
async fn requests_carry_key_range_and_paging() -> Result<()> {
    // ---
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SENSOR_PATH))
        .and(header("X-API-Key", "test-key"))
        .and(query_param("datetime_from", "2023-01-01T00:00:00Z"))
        .and(query_param("datetime_to", "2023-12-31T00:00:00Z"))
        .and(query_param("limit", "1000"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(0, 2)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let series = Collector::new(&client)
        .collect(1671, Some("January 1, 2023"), Some("2023-12-31"))
        .await?;

    assert_eq!(series.records.len(), 2);
    let first = &series.records[0];
    assert_eq!(first.sensor_id, 1671);
    assert_eq!(first.parameter, "pm25");
    assert_eq!(first.value, Some(0.5));
    assert_eq!(first.coverage_percent, Some(100.0));
    assert_eq!(first.median, Some(4.0));
    assert_eq!(first.datetime_utc.to_rfc3339(), "2023-01-01T08:00:00+00:00");
    Ok(())
}

#[tokio::test]
async fn location_expands_to_its_sensors() -> Result<()> {
    // ---
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/locations/1884"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "id": 1884,
                "name": "Test site",
                "sensors": [
                    { "id": 1671, "name": "pm25 µg/m³", "parameter": { "id": 2, "name": "pm25", "units": "µg/m³" } },
                    { "id": 1672, "name": "o3 ppm", "parameter": { "id": 10, "name": "o3", "units": "ppm" } }
                ]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, 1, 200, results(0, 2)).await;
    Mock::given(method("GET"))
        .and(path("/v3/sensors/1672/days"))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(0, 1)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let all = Collector::new(&client)
        .collect_location(1884, &range())
        .await?;

    assert_eq!(all.len(), 2);
    assert_eq!(all[0].records.len(), 2);
    assert_eq!(all[1].records.len(), 1);
    assert_eq!(all[1].records[0].parameter, "o3");
    Ok(())
}

#[tokio::test]
async fn unknown_location_is_not_found() -> Result<()> {
    // ---
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/locations/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = Collector::new(&client).collect_location(42, &range()).await;

    assert!(matches!(result, Err(ApiError::NotFound(_))));
    Ok(())
}
