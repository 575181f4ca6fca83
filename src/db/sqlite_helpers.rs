//! SQLite helper utilities for type conversion
//!
//! SQLite has no native timestamp or JSON types. Campaign data reaches this
//! service from several writers, so timestamp columns may hold RFC 3339 text,
//! SQLite `datetime()` text, bare dates or integer epoch milliseconds. This
//! module normalizes all of them.

use std::cmp::Ordering;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Row, TypeInfo, ValueRef};

// ============================================================================
// Timestamp Helpers
// ============================================================================

/// Parse a stored timestamp string to DateTime
pub fn str_to_datetime(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite's datetime() format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .map(|ndt| ndt.and_utc())
        })
        .or_else(|_| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        })
        .or_else(|_| {
            s.parse::<i64>()
                .map_err(|_| anyhow!("Invalid datetime '{}'", s))
                .and_then(millis_to_datetime)
        })
}

/// Convert epoch milliseconds to DateTime
#[inline]
pub fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| anyhow!("Timestamp out of range: {}", ms))
}

/// Read a timestamp column regardless of its storage class.
///
/// NULL, empty text and values that do not parse as a timestamp decode to
/// `None`; the last are logged.
pub fn timestamp_column(row: &SqliteRow, column: &str) -> sqlx::Result<Option<DateTime<Utc>>> {
    let raw = row.try_get_raw(column)?;
    if raw.is_null() {
        return Ok(None);
    }
    let storage = raw.type_info().name().to_string();

    let parsed = match storage.as_str() {
        "INTEGER" => {
            let ms: i64 = row.try_get(column)?;
            millis_to_datetime(ms)
        }
        "REAL" => {
            let ms: f64 = row.try_get(column)?;
            millis_to_datetime(ms as i64)
        }
        _ => {
            let text: String = row.try_get(column)?;
            if text.trim().is_empty() {
                return Ok(None);
            }
            str_to_datetime(&text)
        }
    };

    match parsed {
        Ok(ts) => Ok(Some(ts)),
        Err(e) => {
            tracing::warn!(column, error = %e, "Ignoring unreadable timestamp");
            Ok(None)
        }
    }
}

// ============================================================================
// Connection setup
// ============================================================================

/// Collation ordering text by its Unicode lowercase form. SQLite's own
/// `lower()` and `NOCASE` only fold ASCII.
pub const UNICASE: &str = "UNICASE";

/// Compare by Unicode lowercase, falling back to the raw text so equal
/// folds still order deterministically
pub fn unicase_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Connect options for `url` with the [UNICASE] collation and the `REGEXP`
/// function installed on every connection
pub fn connect_options(url: &str) -> Result<SqliteConnectOptions> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| anyhow!("Invalid database URL '{}': {}", url, e))?
        .with_regexp()
        .collation(UNICASE, unicase_cmp);
    Ok(options)
}

// ============================================================================
// JSON Helpers (stored as TEXT in SQLite)
// ============================================================================

/// Deserialize a JSON string to a value
#[inline]
pub fn from_json<T: DeserializeOwned>(s: &str) -> Result<T> {
    serde_json::from_str(s).map_err(|e| anyhow!("JSON parse error: {}", e))
}

/// Truthiness of a JSON value the way feature flags are written by hand
/// (`true`, `"true"`, `1`, `"1"`).
pub fn json_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        serde_json::Value::String(s) => s == "true" || s == "1",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use sqlx::sqlite::SqlitePoolOptions;

    #[test]
    fn test_sqlite_datetime_format() {
        let parsed = str_to_datetime("2024-01-15 10:30:45").unwrap();
        assert_eq!(parsed.year(), 2024);
        assert_eq!(parsed.month(), 1);
        assert_eq!(parsed.day(), 15);
        assert_eq!(parsed.hour(), 10);
    }

    #[test]
    fn test_rfc3339_with_offset_is_normalized() {
        let parsed = str_to_datetime("2024-01-15T10:30:45+02:00").unwrap();
        assert_eq!(parsed.hour(), 8);
    }

    #[test]
    fn test_bare_date_and_millis() {
        let date = str_to_datetime("2024-03-01").unwrap();
        assert_eq!((date.month(), date.day(), date.hour()), (3, 1, 0));

        let millis = str_to_datetime("1700000000000").unwrap();
        assert_eq!(millis.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(str_to_datetime("next tuesday").is_err());
    }

    #[test]
    fn test_json_truthy() {
        assert!(json_truthy(&serde_json::json!(true)));
        assert!(json_truthy(&serde_json::json!("1")));
        assert!(json_truthy(&serde_json::json!(1)));
        assert!(!json_truthy(&serde_json::json!("yes")));
        assert!(!json_truthy(&serde_json::Value::Null));
    }

    #[test]
    fn test_unicase_cmp() {
        assert_eq!(unicase_cmp("été", "ÉTÉ"), Ordering::Greater);
        assert_eq!(unicase_cmp("Éclair", "banana"), Ordering::Greater);
        assert_eq!(unicase_cmp("Zebra", "éclair"), Ordering::Less);
        assert_eq!(unicase_cmp("apple", "Banana"), Ordering::Less);
    }

    #[tokio::test]
    async fn test_unreadable_timestamp_is_none() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        let row = sqlx::query("SELECT 'next tuesday' AS bad_ts, '2024-01-15' AS good_ts")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert!(timestamp_column(&row, "bad_ts").unwrap().is_none());
        assert!(timestamp_column(&row, "good_ts").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_timestamp_column_storage_classes() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        let row = sqlx::query(
            "SELECT '2024-01-15 10:30:45' AS text_ts, 1700000000000 AS int_ts, \
             NULL AS null_ts, '' AS empty_ts",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        let text = timestamp_column(&row, "text_ts").unwrap().unwrap();
        assert_eq!(text.day(), 15);
        let int = timestamp_column(&row, "int_ts").unwrap().unwrap();
        assert_eq!(int.timestamp(), 1_700_000_000);
        assert!(timestamp_column(&row, "null_ts").unwrap().is_none());
        assert!(timestamp_column(&row, "empty_ts").unwrap().is_none());
    }
}
