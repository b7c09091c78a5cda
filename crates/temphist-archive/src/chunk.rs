//! Splitting a multi-year range into archive-sized requests.
//!
//! The upstream archive caps one request at roughly a year of daily data,
//! so a long backfill is issued as consecutive chunks with a fixed pause
//! between requests. Chunks run strictly in order; the first failing chunk
//! aborts the whole run so a backfill can never leave silent holes behind.

use crate::client::ArchiveClient;
use crate::types::{ArchiveError, DailyObservation};
use chrono::{Days, NaiveDate};
use std::time::Duration;

/// Split an inclusive date range into consecutive inclusive chunks of at
/// most `max_days` days each, the final chunk clipped to `end`.
///
/// Returns an empty list when `start > end` or `max_days == 0`.
pub fn split_range(start: NaiveDate, end: NaiveDate, max_days: u32) -> Vec<(NaiveDate, NaiveDate)> {
    let mut chunks = Vec::new();
    if start > end || max_days == 0 {
        return chunks;
    }

    let mut cursor = start;
    while cursor <= end {
        let chunk_end = cursor
            .checked_add_days(Days::new(u64::from(max_days) - 1))
            .map_or(end, |candidate| candidate.min(end));
        chunks.push((cursor, chunk_end));

        match chunk_end.checked_add_days(Days::new(1)) {
            Some(next) => cursor = next,
            None => break,
        }
    }

    chunks
}

/// Fetch an inclusive date range chunk by chunk, in chronological order,
/// sleeping `delay` between consecutive requests to respect the upstream
/// rate limit.
///
/// Observations from all chunks are concatenated in order. Any chunk
/// failure aborts the run and propagates.
pub async fn fetch_range(
    client: &ArchiveClient,
    start: NaiveDate,
    end: NaiveDate,
    chunk_days: u32,
    delay: Duration,
) -> Result<Vec<DailyObservation>, ArchiveError> {
    let chunks = split_range(start, end, chunk_days);
    let mut observations = Vec::new();

    for (i, (chunk_start, chunk_end)) in chunks.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        tracing::info!(
            "Fetching chunk {}/{}: {} to {}",
            i + 1,
            chunks.len(),
            chunk_start,
            chunk_end
        );

        let mut chunk = client.fetch_daily(*chunk_start, *chunk_end).await?;
        observations.append(&mut chunk);
    }

    Ok(observations)
}
