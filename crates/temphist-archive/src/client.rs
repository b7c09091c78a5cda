//! HTTP client for the Open-Meteo historical archive.

use crate::types::{ArchiveError, ArchiveResponse, DailyObservation, DailySeries};
use chrono::NaiveDate;
use reqwest::Client;
use std::time::Duration;

/// Provenance tag recorded on every persisted row.
pub const SOURCE: &str = "open-meteo";

const DAILY_METRICS: &str = "temperature_2m_mean,temperature_2m_min,temperature_2m_max";

/// Settings needed to construct an [`ArchiveClient`].
#[derive(Debug, Clone)]
pub struct ArchiveClientConfig {
    /// Base URL, e.g. `https://archive-api.open-meteo.com`
    pub base_url: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone the daily boundaries are aligned to
    pub timezone: String,
    pub timeout: Duration,
}

/// Client for one fixed geographic point of the archive API.
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    http: Client,
    base_url: String,
    latitude: f64,
    longitude: f64,
    timezone: String,
}

impl ArchiveClient {
    pub fn new(config: ArchiveClientConfig) -> Result<Self, ArchiveError> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            latitude: config.latitude,
            longitude: config.longitude,
            timezone: config.timezone,
        })
    }

    /// Fetch daily observations for an inclusive date range in one request.
    ///
    /// A response without a `daily` section or with an empty `daily.time`
    /// yields an empty list. The returned days are whatever the archive
    /// reported, which may be fewer than the requested range.
    pub async fn fetch_daily(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyObservation>, ArchiveError> {
        let url = format!(
            "{}/v1/archive?latitude={}&longitude={}&start_date={}&end_date={}&daily={}&timezone={}",
            self.base_url,
            self.latitude,
            self.longitude,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
            DAILY_METRICS,
            self.timezone,
        );

        tracing::debug!("Fetching archive data from {} to {}", start, end);

        let response = self.http.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArchiveError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: ArchiveResponse = serde_json::from_str(&body)
            .map_err(|e| ArchiveError::Schema(format!("undecodable body: {}", e)))?;

        let Some(daily) = parsed.daily else {
            tracing::warn!("Archive response is missing the daily section");
            return Ok(Vec::new());
        };

        let observations = normalize(daily)?;
        tracing::debug!("Fetched {} observations", observations.len());
        Ok(observations)
    }
}

/// Turn the parallel wire arrays into per-day observations, checking that
/// every array lines up with `daily.time`.
fn normalize(daily: DailySeries) -> Result<Vec<DailyObservation>, ArchiveError> {
    if daily.time.is_empty() {
        return Ok(Vec::new());
    }

    let n = daily.time.len();
    let highs = required_series(daily.temperature_2m_max, "temperature_2m_max", n)?;
    let lows = required_series(daily.temperature_2m_min, "temperature_2m_min", n)?;
    let means = required_series(daily.temperature_2m_mean, "temperature_2m_mean", n)?;

    let mut observations = Vec::with_capacity(n);
    for (i, raw_date) in daily.time.iter().enumerate() {
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|e| {
            ArchiveError::Schema(format!("invalid date '{}' in daily.time: {}", raw_date, e))
        })?;

        observations.push(DailyObservation {
            date,
            temp_high: highs[i],
            temp_low: lows[i],
            temp_mean: means[i],
        });
    }

    Ok(observations)
}

fn required_series(
    series: Option<Vec<Option<f64>>>,
    name: &str,
    expected_len: usize,
) -> Result<Vec<Option<f64>>, ArchiveError> {
    let values =
        series.ok_or_else(|| ArchiveError::Schema(format!("daily.{} is missing", name)))?;

    if values.len() != expected_len {
        return Err(ArchiveError::Schema(format!(
            "daily.{} has {} entries, expected {}",
            name,
            values.len(),
            expected_len
        )));
    }

    Ok(values)
}
