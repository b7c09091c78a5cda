use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One persisted day of temperature data.
///
/// Every numeric field is required: days with missing upstream values are
/// dropped before they ever reach the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRecord {
    /// Calendar date, the unique key
    pub date: NaiveDate,
    /// Daily maximum, degrees Celsius
    pub temp_high: f64,
    /// Daily minimum, degrees Celsius
    pub temp_low: f64,
    /// Daily mean, degrees Celsius
    pub temp_avg: f64,
    /// Trailing 7-day mean of `temp_avg`, ending at `date`
    pub temp_avg7: f64,
    /// Which upstream produced this row
    pub source: String,
}
