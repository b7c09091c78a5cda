//! Open-Meteo archive ingestion primitives.
//!
//! Fetches daily temperature observations for a fixed geographic point,
//! splits long ranges into upstream-sized chunks, and computes the
//! trailing 7-day moving average used by the charting frontend.

pub mod average;
pub mod chunk;
pub mod client;
pub mod types;

pub use average::{trailing_mean, WINDOW_DAYS};
pub use chunk::{fetch_range, split_range};
pub use client::{ArchiveClient, ArchiveClientConfig, SOURCE};
pub use types::{ArchiveError, DailyObservation};
