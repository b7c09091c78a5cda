//! Ingestion pipeline wiring the archive client, the moving average and
//! the date-keyed store together.

pub mod pipeline;

pub use pipeline::{backfill, backfill_as_of, build_records, update_latest, update_latest_as_of, IngestOutcome};
