//! The ingestion pipeline: archive fetch, moving average, upsert.
//!
//! Two entry points share the plumbing: [`update_latest`] appends whatever
//! days are missing between the newest stored date and today, and
//! [`backfill`] loads the full configured lookback window from scratch.
//! Both open the store for the duration of one run and drop it on every
//! exit path.

use chrono::{Datelike, Days, Local, NaiveDate};
use std::time::Duration;
use temphist_archive::{
    fetch_range, trailing_mean, ArchiveClient, DailyObservation, SOURCE, WINDOW_DAYS,
};
use temphist_core::{AppError, Config};
use temphist_store::{TemperatureRecord, TemperatureStore};

/// Result of one ingestion run, shaped for the trigger endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Rows actually written to the store
    pub added: usize,
    pub message: String,
}

impl IngestOutcome {
    fn nothing_to_do(message: &str) -> Self {
        Self {
            added: 0,
            message: message.to_string(),
        }
    }
}

/// Turn raw observations into persistable records.
///
/// `lookback` carries already-persisted `(date, temp_avg)` pairs from the
/// days immediately before the first observation; they are prepended as
/// average-only context so the moving average is correct at the boundary,
/// and never re-emitted. Days with any missing required field are dropped
/// with a warning. `temp_avg7` is rounded to one decimal.
pub fn build_records(
    observations: &[DailyObservation],
    lookback: &[(NaiveDate, f64)],
) -> Vec<TemperatureRecord> {
    let mut series: Vec<Option<f64>> = Vec::with_capacity(lookback.len() + observations.len());
    series.extend(lookback.iter().map(|(_, avg)| Some(*avg)));
    series.extend(observations.iter().map(|o| o.temp_mean));

    let averages = trailing_mean(&series);

    let mut records = Vec::with_capacity(observations.len());
    for (i, obs) in observations.iter().enumerate() {
        let avg7 = averages[lookback.len() + i];
        match (obs.temp_high, obs.temp_low, obs.temp_mean, avg7) {
            (Some(temp_high), Some(temp_low), Some(temp_avg), Some(avg7)) => {
                records.push(TemperatureRecord {
                    date: obs.date,
                    temp_high,
                    temp_low,
                    temp_avg,
                    temp_avg7: round_one_decimal(avg7),
                    source: SOURCE.to_string(),
                });
            }
            _ => {
                tracing::warn!("Skipping {}: missing temperature value", obs.date);
            }
        }
    }

    records
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Incremental update: ingest everything from the newest stored date + 1
/// day through today.
pub async fn update_latest(
    client: &ArchiveClient,
    config: &Config,
) -> Result<IngestOutcome, AppError> {
    update_latest_as_of(client, config, Local::now().date_naive()).await
}

/// [`update_latest`] with an explicit "today", so tests can pin the range.
pub async fn update_latest_as_of(
    client: &ArchiveClient,
    config: &Config,
    today: NaiveDate,
) -> Result<IngestOutcome, AppError> {
    let mut store = TemperatureStore::open(&config.store.db_path)?;

    let start = match store.latest_date()? {
        Some(latest) => latest.checked_add_days(Days::new(1)).unwrap_or(latest),
        None => config.archive.epoch_start,
    };

    if start > today {
        tracing::info!("Store already covers {}, nothing to fetch", today);
        return Ok(IngestOutcome::nothing_to_do("Data is already up to date."));
    }

    tracing::info!("Updating temperature data from {} to {}", start, today);

    let observations = fetch_range(
        client,
        start,
        today,
        config.archive.chunk_days,
        Duration::from_millis(config.archive.delay_ms),
    )
    .await?;

    if observations.is_empty() {
        return Ok(IngestOutcome::nothing_to_do(
            "No new data available from the archive.",
        ));
    }

    // Already-persisted averages from just before the fetch range keep the
    // 7-day mean correct for the first new days.
    let lookback = match start.checked_sub_days(Days::new(1)) {
        Some(end) => store.lookback_avgs(end, WINDOW_DAYS as u32)?,
        None => Vec::new(),
    };

    let records: Vec<TemperatureRecord> = build_records(&observations, &lookback)
        .into_iter()
        .filter(|r| r.date >= start && r.date <= today)
        .collect();

    if records.is_empty() {
        return Ok(IngestOutcome::nothing_to_do(
            "Fetched data had no usable temperature values.",
        ));
    }

    let added = store.insert_new_batch(&records)?;
    tracing::info!("Ingestion added {} new records", added);

    Ok(IngestOutcome {
        added,
        message: format!("Added {} new records.", added),
    })
}

/// Full historical load: the configured number of years back through
/// today, written in pure upsert mode (existing dates are overwritten).
pub async fn backfill(client: &ArchiveClient, config: &Config) -> Result<IngestOutcome, AppError> {
    backfill_as_of(client, config, Local::now().date_naive()).await
}

/// [`backfill`] with an explicit "today".
pub async fn backfill_as_of(
    client: &ArchiveClient,
    config: &Config,
    today: NaiveDate,
) -> Result<IngestOutcome, AppError> {
    let years = i32::try_from(config.archive.backfill_years).unwrap_or(i32::MAX);
    let target_year = today.year().saturating_sub(years);
    let start = today
        .with_year(target_year)
        // Feb 29 with no counterpart in the target year
        .or_else(|| NaiveDate::from_ymd_opt(target_year, 3, 1))
        .unwrap_or(config.archive.epoch_start);

    tracing::info!("Backfilling temperature data from {} to {}", start, today);

    let observations = fetch_range(
        client,
        start,
        today,
        config.archive.chunk_days,
        Duration::from_millis(config.archive.delay_ms),
    )
    .await?;

    let records = build_records(&observations, &[]);

    let mut store = TemperatureStore::open(&config.store.db_path)?;
    let added = store.upsert_batch(&records)?;
    tracing::info!("Backfill wrote {} records", added);

    Ok(IngestOutcome {
        added,
        message: format!("Backfill complete: {} records written.", added),
    })
}
