//! HTTP surface: the ingestion trigger and the chart query endpoint.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use temphist_archive::{ArchiveClient, ArchiveClientConfig, ArchiveError};
use temphist_core::Config;
use temphist_store::{chart_rows, ChartRow, TemperatureStore};
use warp::http::StatusCode;
use warp::{Filter, Reply};

/// Shared server state. The store itself is deliberately absent: handlers
/// open a store handle per operation and drop it when done.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    /// Serializes ingestion runs; overlapping triggers are rejected
    ingest_lock: Arc<tokio::sync::Mutex<()>>,
    /// Chart rows keyed by the normalized year list, cleared after every
    /// successful ingestion
    chart_cache: Arc<RwLock<HashMap<String, Vec<ChartRow>>>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            ingest_lock: Arc::new(tokio::sync::Mutex::new(())),
            chart_cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

/// Build the archive client from the configured location and base URL.
pub fn archive_client(config: &Config) -> Result<ArchiveClient, ArchiveError> {
    ArchiveClient::new(ArchiveClientConfig {
        base_url: config.archive.base_url.clone(),
        latitude: config.location.latitude,
        longitude: config.location.longitude,
        timezone: config.location.timezone.clone(),
        timeout: Duration::from_secs(config.archive.timeout_secs),
    })
}

#[derive(Debug, Serialize)]
struct TriggerResponse {
    success: bool,
    message: String,
    added: usize,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// All API routes
pub fn api(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    let trigger = warp::path!("api" / "etl")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and_then(trigger_etl);

    let temperatures = warp::path!("api" / "temperatures")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state))
        .and_then(get_temperatures);

    trigger.or(temperatures)
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// POST /api/etl - run one incremental ingestion pass.
///
/// Always replies with a structured body; errors never propagate past
/// this boundary.
async fn trigger_etl(
    state: AppState,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Infallible> {
    let Ok(_guard) = state.ingest_lock.try_lock() else {
        let body = TriggerResponse {
            success: false,
            message: "An ingestion run is already in progress.".to_string(),
            added: 0,
        };
        return Ok(warp::reply::with_status(
            warp::reply::json(&body),
            StatusCode::CONFLICT,
        ));
    };

    let client = match archive_client(&state.config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to build archive client: {}", e);
            return Ok(trigger_failure(
                "Could not initialize the archive client.",
            ));
        }
    };

    match temphist_etl::update_latest(&client, &state.config).await {
        Ok(outcome) => {
            state.chart_cache.write().clear();
            let body = TriggerResponse {
                success: true,
                message: outcome.message,
                added: outcome.added,
            };
            Ok(warp::reply::with_status(
                warp::reply::json(&body),
                StatusCode::OK,
            ))
        }
        Err(e) => {
            tracing::error!("Ingestion failed: {}", e);
            Ok(trigger_failure(e.user_message()))
        }
    }
}

fn trigger_failure(message: &str) -> warp::reply::WithStatus<warp::reply::Json> {
    let body = TriggerResponse {
        success: false,
        message: message.to_string(),
        added: 0,
    };
    warp::reply::with_status(warp::reply::json(&body), StatusCode::INTERNAL_SERVER_ERROR)
}

/// GET /api/temperatures?years=2023,2024 - chart rows for a set of years.
async fn get_temperatures(
    params: HashMap<String, String>,
    state: AppState,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Infallible> {
    let Some(raw_years) = params.get("years") else {
        return Ok(client_error(
            "Missing 'years' query parameter (e.g. ?years=2023,2024)",
        ));
    };

    // Unparseable tokens are filtered silently
    let mut years: Vec<i32> = raw_years
        .split(',')
        .filter_map(|token| token.trim().parse().ok())
        .collect();
    years.sort_unstable();
    years.dedup();

    if years.is_empty() {
        return Ok(client_error("No valid years in 'years' parameter"));
    }

    let cache_key = years
        .iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(",");

    if let Some(rows) = state.chart_cache.read().get(&cache_key) {
        return Ok(warp::reply::with_status(
            warp::reply::json(rows),
            StatusCode::OK,
        ));
    }

    let db_path = state.config.store.db_path.clone();
    let query_years = years.clone();
    let result = tokio::task::spawn_blocking(move || {
        let store = TemperatureStore::open(&db_path)?;
        chart_rows(&store, &query_years)
    })
    .await;

    match result {
        Ok(Ok(rows)) => {
            state.chart_cache.write().insert(cache_key, rows.clone());
            Ok(warp::reply::with_status(
                warp::reply::json(&rows),
                StatusCode::OK,
            ))
        }
        Ok(Err(e)) => {
            tracing::error!("Chart query failed: {:#}", e);
            Ok(server_error())
        }
        Err(e) => {
            tracing::error!("Chart query task panicked: {}", e);
            Ok(server_error())
        }
    }
}

fn client_error(message: &str) -> warp::reply::WithStatus<warp::reply::Json> {
    let body = ErrorResponse {
        error: message.to_string(),
    };
    warp::reply::with_status(warp::reply::json(&body), StatusCode::BAD_REQUEST)
}

fn server_error() -> warp::reply::WithStatus<warp::reply::Json> {
    let body = ErrorResponse {
        error: "Internal server error".to_string(),
    };
    warp::reply::with_status(warp::reply::json(&body), StatusCode::INTERNAL_SERVER_ERROR)
}
