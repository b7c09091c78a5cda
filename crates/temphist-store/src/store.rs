use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::record::TemperatureRecord;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Local SQLite storage for daily temperature records, keyed by date.
///
/// A store handle is meant to be opened for one operation (an ingestion
/// run, a query) and dropped when it goes out of scope; nothing holds a
/// connection globally.
pub struct TemperatureStore {
    conn: Connection,
}

impl TemperatureStore {
    /// Open or create the database
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create database directory")?;
        }
        let conn = Connection::open(path).context("Failed to open temperature database")?;

        let store = Self { conn };
        store.init_schema()?;

        Ok(store)
    }

    /// Open an in-memory store (for tests)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS temperature_history (
                    date TEXT PRIMARY KEY,
                    temp_high REAL NOT NULL,
                    temp_low REAL NOT NULL,
                    temp_avg REAL NOT NULL,
                    temp_avg7 REAL NOT NULL,
                    source TEXT NOT NULL
                );",
            )
            .context("Failed to initialize schema")?;

        Ok(())
    }

    /// Insert or replace records keyed by date, the whole batch in one
    /// transaction. Returns the number of rows written.
    pub fn upsert_batch(&mut self, records: &[TemperatureRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut written = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO temperature_history (date, temp_high, temp_low, temp_avg, temp_avg7, source)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(date) DO UPDATE SET
                    temp_high = excluded.temp_high,
                    temp_low = excluded.temp_low,
                    temp_avg = excluded.temp_avg,
                    temp_avg7 = excluded.temp_avg7,
                    source = excluded.source",
            )?;

            for record in records {
                written += stmt.execute(params![
                    date_to_sql(record.date),
                    record.temp_high,
                    record.temp_low,
                    record.temp_avg,
                    record.temp_avg7,
                    record.source,
                ])?;
            }
        }

        tx.commit().context("Failed to commit upsert batch")?;
        Ok(written)
    }

    /// Insert records whose date is not yet present, the whole batch in
    /// one transaction; already-stored dates are left untouched. Returns
    /// the number of rows actually written.
    pub fn insert_new_batch(&mut self, records: &[TemperatureRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut written = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO temperature_history
                    (date, temp_high, temp_low, temp_avg, temp_avg7, source)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;

            for record in records {
                written += stmt.execute(params![
                    date_to_sql(record.date),
                    record.temp_high,
                    record.temp_low,
                    record.temp_avg,
                    record.temp_avg7,
                    record.source,
                ])?;
            }
        }

        tx.commit().context("Failed to commit insert batch")?;
        Ok(written)
    }

    /// The most recent stored date, or None when the store is empty
    pub fn latest_date(&self) -> Result<Option<NaiveDate>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT MAX(date) FROM temperature_history", [], |row| row.get(0))
            .optional()?
            .flatten();

        raw.map(|s| sql_to_date(&s)).transpose()
    }

    /// The `(date, temp_avg)` pairs for the `days` calendar days ending at
    /// `end` inclusive, ascending by date. Days absent from the store are
    /// simply not returned.
    pub fn lookback_avgs(&self, end: NaiveDate, days: u32) -> Result<Vec<(NaiveDate, f64)>> {
        let start = end
            .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
            .unwrap_or(end);

        let mut stmt = self.conn.prepare(
            "SELECT date, temp_avg FROM temperature_history
             WHERE date >= ?1 AND date <= ?2
             ORDER BY date ASC",
        )?;

        let raw = stmt
            .query_map(params![date_to_sql(start), date_to_sql(end)], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(date, avg)| Ok((sql_to_date(&date)?, avg)))
            .collect()
    }

    /// All records within one calendar year, ascending by date
    pub fn records_for_year(&self, year: i32) -> Result<Vec<TemperatureRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, temp_high, temp_low, temp_avg, temp_avg7, source
             FROM temperature_history
             WHERE date >= ?1 AND date < ?2
             ORDER BY date ASC",
        )?;

        let raw = stmt
            .query_map(
                params![format!("{:04}-01-01", year), format!("{:04}-01-01", year + 1)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(date, temp_high, temp_low, temp_avg, temp_avg7, source)| {
                Ok(TemperatureRecord {
                    date: sql_to_date(&date)?,
                    temp_high,
                    temp_low,
                    temp_avg,
                    temp_avg7,
                    source,
                })
            })
            .collect()
    }

    /// Total number of stored records
    pub fn count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM temperature_history", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn date_to_sql(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn sql_to_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .with_context(|| format!("Malformed date in store: {}", raw))
}
