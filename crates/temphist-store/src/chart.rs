//! Read API for the charting frontend: per-year series merged into one
//! row per month-day so multiple years can be overlaid on a shared axis.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::store::TemperatureStore;

/// One chart row: a month-day plus the year-scoped metrics present for it,
/// flattened to keys like `2024_avg7`, `2024_high`, `2024_low`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRow {
    /// `MM-DD`
    pub date: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

/// Build the chart rows for a set of years: every stored date within those
/// years, merged by month-day, sorted ascending by month-day.
pub fn chart_rows(store: &TemperatureStore, years: &[i32]) -> Result<Vec<ChartRow>> {
    let mut merged: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();

    for &year in years {
        for record in store.records_for_year(year)? {
            let month_day = record.date.format("%m-%d").to_string();
            let row = merged.entry(month_day).or_default();
            row.insert(format!("{}_avg7", year), record.temp_avg7);
            row.insert(format!("{}_high", year), record.temp_high);
            row.insert(format!("{}_low", year), record.temp_low);
        }
    }

    Ok(merged
        .into_iter()
        .map(|(date, values)| ChartRow { date, values })
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::record::TemperatureRecord;
    use chrono::NaiveDate;

    fn record(y: i32, m: u32, d: u32, avg: f64) -> TemperatureRecord {
        TemperatureRecord {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            temp_high: avg + 5.0,
            temp_low: avg - 5.0,
            temp_avg: avg,
            temp_avg7: avg,
            source: "open-meteo".to_string(),
        }
    }

    #[test]
    fn test_rows_merge_years_on_month_day() {
        let mut store = TemperatureStore::open_in_memory().unwrap();
        store
            .upsert_batch(&[
                record(2023, 7, 1, 24.0),
                record(2024, 7, 1, 26.0),
                record(2024, 7, 2, 27.0),
            ])
            .unwrap();

        let rows = chart_rows(&store, &[2023, 2024]).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].date, "07-01");
        assert_eq!(rows[0].values.get("2023_avg7"), Some(&24.0));
        assert_eq!(rows[0].values.get("2024_avg7"), Some(&26.0));
        assert_eq!(rows[0].values.get("2023_high"), Some(&29.0));
        assert_eq!(rows[0].values.get("2024_low"), Some(&21.0));

        assert_eq!(rows[1].date, "07-02");
        assert!(rows[1].values.get("2023_avg7").is_none());
        assert_eq!(rows[1].values.get("2024_avg7"), Some(&27.0));
    }

    #[test]
    fn test_rows_sorted_by_month_day() {
        let mut store = TemperatureStore::open_in_memory().unwrap();
        store
            .upsert_batch(&[
                record(2024, 12, 31, 5.0),
                record(2024, 1, 1, 6.0),
                record(2024, 6, 15, 22.0),
            ])
            .unwrap();

        let rows = chart_rows(&store, &[2024]).unwrap();
        let dates: Vec<&str> = rows.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["01-01", "06-15", "12-31"]);
    }

    #[test]
    fn test_year_without_data_contributes_nothing() {
        let mut store = TemperatureStore::open_in_memory().unwrap();
        store.upsert_batch(&[record(2024, 7, 1, 26.0)]).unwrap();

        let rows = chart_rows(&store, &[1999, 2024]).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].values.get("1999_avg7").is_none());
    }
}
