//! End-to-end pipeline tests against a mock archive and a temp store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::NaiveDate;
use serde_json::json;
use std::path::Path;
use temphist_archive::{ArchiveClient, ArchiveClientConfig};
use temphist_core::Config;
use temphist_etl::{backfill_as_of, update_latest_as_of, IngestOutcome};
use temphist_store::{TemperatureRecord, TemperatureStore};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn test_config(base_url: &str, db_dir: &Path, epoch: &str) -> Config {
    let mut config = Config::default();
    config.archive.base_url = base_url.to_string();
    config.archive.delay_ms = 0;
    config.archive.epoch_start = date(epoch);
    config.store.db_path = db_dir.join("temps.db");
    config
}

fn test_client(config: &Config) -> ArchiveClient {
    ArchiveClient::new(ArchiveClientConfig {
        base_url: config.archive.base_url.clone(),
        latitude: config.location.latitude,
        longitude: config.location.longitude,
        timezone: config.location.timezone.clone(),
        timeout: std::time::Duration::from_secs(5),
    })
    .unwrap()
}

/// Ten days of data, one of them with a null daily maximum.
fn ten_day_body() -> serde_json::Value {
    let times: Vec<String> = (11..=20).map(|d| format!("2024-05-{:02}", d)).collect();
    let mut highs: Vec<Option<f64>> = (11..=20).map(|d| Some(20.0 + f64::from(d))).collect();
    let lows: Vec<Option<f64>> = (11..=20).map(|d| Some(5.0 + f64::from(d))).collect();
    let means: Vec<Option<f64>> = (11..=20).map(|d| Some(12.0 + f64::from(d))).collect();
    highs[3] = None; // 2024-05-14

    json!({
        "daily": {
            "time": times,
            "temperature_2m_max": highs,
            "temperature_2m_min": lows,
            "temperature_2m_mean": means,
        }
    })
}

#[tokio::test]
async fn test_initial_ingestion_and_idempotence() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/archive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ten_day_body()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path(), "2024-05-11");
    let client = test_client(&config);
    let today = date("2024-05-20");

    let outcome = update_latest_as_of(&client, &config, today).await.unwrap();
    // 10 fetched days minus the null-high one
    assert_eq!(outcome.added, 9);

    let store = TemperatureStore::open(&config.store.db_path).unwrap();
    assert_eq!(store.count().unwrap(), 9);

    let records = store.records_for_year(2024).unwrap();
    // The null-high day never reached the store
    assert!(records.iter().all(|r| r.date != date("2024-05-14")));
    // First day of the series: window contains only itself
    assert_eq!(records[0].date, date("2024-05-11"));
    assert_eq!(records[0].temp_avg7, records[0].temp_avg);
    drop(store);

    // Second run over the same range: everything is already stored
    let outcome = update_latest_as_of(&client, &config, today).await.unwrap();
    assert_eq!(
        outcome,
        IngestOutcome {
            added: 0,
            message: "Data is already up to date.".to_string(),
        }
    );
}

#[tokio::test]
async fn test_boundary_average_uses_persisted_lookback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/archive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "daily": {
                "time": ["2024-05-11"],
                "temperature_2m_max": [25.0],
                "temperature_2m_min": [9.0],
                "temperature_2m_mean": [17.0],
            }
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path(), "2024-05-04");
    let client = test_client(&config);

    // Seed 2024-05-04 .. 2024-05-10 with a flat 10.0 average
    {
        let mut store = TemperatureStore::open(&config.store.db_path).unwrap();
        let seeded: Vec<TemperatureRecord> = (4..=10)
            .map(|d| TemperatureRecord {
                date: date(&format!("2024-05-{:02}", d)),
                temp_high: 15.0,
                temp_low: 5.0,
                temp_avg: 10.0,
                temp_avg7: 10.0,
                source: "open-meteo".to_string(),
            })
            .collect();
        store.upsert_batch(&seeded).unwrap();
    }

    let outcome = update_latest_as_of(&client, &config, date("2024-05-11"))
        .await
        .unwrap();
    assert_eq!(outcome.added, 1);

    let store = TemperatureStore::open(&config.store.db_path).unwrap();
    let records = store.records_for_year(2024).unwrap();
    let new_day = records.iter().find(|r| r.date == date("2024-05-11")).unwrap();
    // Window: six persisted days at 10.0 plus the new mean 17.0
    assert_eq!(new_day.temp_avg7, 11.0);
    // The lookback context was not re-persisted with altered values
    assert_eq!(store.count().unwrap(), 8);
}

#[tokio::test]
async fn test_backfill_covers_lookback_years_and_overwrites() {
    let server = MockServer::start().await;

    // One year back from 2024-05-20: the first chunk must start at
    // 2023-05-20 and the 365-day split puts the second at 2024-05-19.
    Mock::given(method("GET"))
        .and(path("/v1/archive"))
        .and(query_param("start_date", "2023-05-20"))
        .and(query_param("end_date", "2024-05-18"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "daily": { "time": [] } })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/archive"))
        .and(query_param("start_date", "2024-05-19"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "daily": {
                "time": ["2024-05-19", "2024-05-20"],
                "temperature_2m_max": [26.0, 28.0],
                "temperature_2m_min": [14.0, 16.0],
                "temperature_2m_mean": [20.0, 22.0],
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server.uri(), dir.path(), "2023-01-01");
    config.archive.backfill_years = 1;
    let client = test_client(&config);

    // A stale row for a date the backfill also covers
    {
        let mut store = TemperatureStore::open(&config.store.db_path).unwrap();
        store
            .upsert_batch(&[TemperatureRecord {
                date: date("2024-05-20"),
                temp_high: 99.0,
                temp_low: 99.0,
                temp_avg: 99.0,
                temp_avg7: 99.0,
                source: "open-meteo".to_string(),
            }])
            .unwrap();
    }

    let outcome = backfill_as_of(&client, &config, date("2024-05-20"))
        .await
        .unwrap();
    assert_eq!(outcome.added, 2);

    let store = TemperatureStore::open(&config.store.db_path).unwrap();
    assert_eq!(store.count().unwrap(), 2);

    let records = store.records_for_year(2024).unwrap();
    // Pure upsert mode: the stale row was overwritten, not skipped
    let overwritten = records.iter().find(|r| r.date == date("2024-05-20")).unwrap();
    assert_eq!(overwritten.temp_avg, 22.0);
    assert_eq!(overwritten.temp_high, 28.0);
}

#[tokio::test]
async fn test_upstream_failure_aborts_without_partial_writes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/archive"))
        .respond_with(ResponseTemplate::new(500).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path(), "2024-05-11");
    let client = test_client(&config);

    let err = update_latest_as_of(&client, &config, date("2024-05-20")).await;
    assert!(err.is_err());

    let store = TemperatureStore::open(&config.store.db_path).unwrap();
    assert_eq!(store.count().unwrap(), 0);
}

#[tokio::test]
async fn test_empty_archive_response_reports_zero_added() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/archive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "daily": { "time": [] } })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.uri(), dir.path(), "2024-05-11");
    let client = test_client(&config);

    let outcome = update_latest_as_of(&client, &config, date("2024-05-20"))
        .await
        .unwrap();
    assert_eq!(outcome.added, 0);
}
