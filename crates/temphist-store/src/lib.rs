//! Date-keyed SQLite persistence for daily temperature records, plus the
//! chart-oriented read queries.

pub mod chart;
pub mod record;
pub mod store;

pub use chart::{chart_rows, ChartRow};
pub use record::TemperatureRecord;
pub use store::TemperatureStore;
