//! Column codecs for values SQLite has no native type for.
//!
//! Decimals are stored as TEXT to keep exact cents and tenths of an hour.
//! Timestamps are stored as RFC 3339 UTC with whole seconds and a `Z` suffix,
//! so comparing the text compares the instants.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use std::str::FromStr;

pub fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn opt_ts(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(ts)
}

pub fn dec(d: Decimal) -> String {
    d.normalize().to_string()
}

pub fn opt_dec(d: Option<Decimal>) -> Option<String> {
    d.map(dec)
}

pub fn get_decimal(row: &SqliteRow, col: &str) -> Result<Decimal, sqlx::Error> {
    let raw: String = row.try_get(col)?;
    Decimal::from_str(&raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

pub fn get_opt_decimal(row: &SqliteRow, col: &str) -> Result<Option<Decimal>, sqlx::Error> {
    let raw: Option<String> = row.try_get(col)?;
    raw.map(|s| Decimal::from_str(&s).map_err(|e| sqlx::Error::Decode(Box::new(e))))
        .transpose()
}

pub fn get_time(row: &SqliteRow, col: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let raw: String = row.try_get(col)?;
    parse_time(&raw)
}

pub fn get_opt_time(row: &SqliteRow, col: &str) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    let raw: Option<String> = row.try_get(col)?;
    raw.as_deref().map(parse_time).transpose()
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// Enums stored as their strum string form.
pub fn get_enum<T>(row: &SqliteRow, col: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(col)?;
    raw.parse().map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_sort_as_text() {
        let a = ts(Utc.with_ymd_and_hms(2026, 1, 2, 9, 0, 0).unwrap());
        let b = ts(Utc.with_ymd_and_hms(2026, 1, 2, 10, 30, 0).unwrap());
        assert_eq!(a, "2026-01-02T09:00:00Z");
        assert!(a < b);
    }

    #[test]
    fn decimals_are_normalized() {
        assert_eq!(dec("1.50".parse().unwrap()), "1.5");
        assert_eq!(dec("120.00".parse().unwrap()), "120");
    }
}
