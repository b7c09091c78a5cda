use chrono::NaiveDate;
use serde::Deserialize;

/// One day of raw upstream observations.
///
/// Each temperature field is independently nullable: the upstream archive
/// reports `null` for days it has no measurement for.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyObservation {
    pub date: NaiveDate,
    /// Daily maximum, degrees Celsius
    pub temp_high: Option<f64>,
    /// Daily minimum, degrees Celsius
    pub temp_low: Option<f64>,
    /// Daily mean, degrees Celsius
    pub temp_mean: Option<f64>,
}

/// Wire shape of the archive response.
///
/// `daily` holds parallel arrays: `time[i]` labels the i-th entry of each
/// temperature array. A response without a `daily` section is treated as
/// "no data", not an error.
#[derive(Debug, Deserialize)]
pub(crate) struct ArchiveResponse {
    pub daily: Option<DailySeries>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DailySeries {
    #[serde(default)]
    pub time: Vec<String>,
    pub temperature_2m_max: Option<Vec<Option<f64>>>,
    pub temperature_2m_min: Option<Vec<Option<f64>>>,
    pub temperature_2m_mean: Option<Vec<Option<f64>>>,
}

/// Archive client errors
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("archive returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected archive response: {0}")]
    Schema(String),
}
