//! Utility functions for date parsing, string truncation, and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Tolerant parsing of the date strings extractors and pages produce
//! - Detection of dates encoded in article URL paths
//! - String truncation for logging and for bounding extractor input
//! - JSON error detection for handling LLM response truncation
//! - File system validation for output directories

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::ops::RangeInclusive;
use tokio::fs;
use tracing::{info, instrument};

static ISO_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").expect("static regex"));

static URL_PATH_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(\d{4})[/-](\d{1,2})[/-](\d{1,2})(?:/|-|$)").expect("static regex")
});

const PLAUSIBLE_YEARS: RangeInclusive<i32> = 1900..=9999;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%b. %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%A, %B %d, %Y",
    "%a, %d %b %Y",
];

/// Parse a calendar date out of the loosely formatted strings found on pages.
///
/// Accepts ISO dates, ISO/RFC 3339 and RFC 2822 datetimes (the date part is
/// kept), and the common written forms such as `January 20, 2025` or
/// `20 Jan 2025`. Returns `None` for anything else, including dates outside
/// the years 1900 to 9999.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_any_date(raw).filter(plausible_year)
}

fn plausible_year(date: &NaiveDate) -> bool {
    PLAUSIBLE_YEARS.contains(&date.year())
}

fn parse_any_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim().trim_end_matches('.');
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    // "2025-01-20 08:00 UTC" and friends
    let caps = ISO_PREFIX.captures(s)?;
    ymd(&caps[1], &caps[2], &caps[3])
}

/// Find a `/YYYY/MM/DD/` style date in a URL path.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(url_path_date("https://lite.cnn.com/2025/05/06/slug"), NaiveDate::from_ymd_opt(2025, 5, 6));
/// ```
pub fn url_path_date(url: &str) -> Option<NaiveDate> {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    };
    let caps = URL_PATH_DATE.captures(&path)?;
    ymd(&caps[1], &caps[2], &caps[3])
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?).filter(plausible_year)
}

/// Cut `s` to at most `max` characters, never splitting a character.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let head = truncate_chars(s, max);
    if head.len() == s.len() {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", head, s.len() - head.len())
    }
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// When the LLM response is cut off (e.g., due to token limits), the
/// resulting JSON will fail to parse with an EOF error.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, day)
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2025-01-20"), d(2025, 1, 20));
        assert_eq!(parse_date(" 2025/01/20 "), d(2025, 1, 20));
        assert_eq!(parse_date("2025-01-20T08:30:00Z"), d(2025, 1, 20));
        assert_eq!(parse_date("2025-01-20T08:30:00+02:00"), d(2025, 1, 20));
        assert_eq!(parse_date("2025-01-20T08:30:00"), d(2025, 1, 20));
        assert_eq!(parse_date("2025-01-20 08:30 UTC"), d(2025, 1, 20));
        assert_eq!(parse_date("January 20, 2025"), d(2025, 1, 20));
        assert_eq!(parse_date("Jan 20, 2025"), d(2025, 1, 20));
        assert_eq!(parse_date("20 January 2025"), d(2025, 1, 20));
        assert_eq!(parse_date("Mon, 20 Jan 2025 10:00:00 +0000"), d(2025, 1, 20));
    }

    #[test]
    fn test_parse_date_rejects_noise() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2025-13-40"), None);
        assert_eq!(parse_date("-262143-01-01"), None);
        assert_eq!(parse_date("+262142-12-31"), None);
        assert_eq!(parse_date("0001-01-01"), None);
        assert_eq!(parse_date("1899-12-31"), None);
        assert_eq!(parse_date("1900-01-01"), d(1900, 1, 1));
        assert_eq!(parse_date("© 1999"), None);
    }

    #[test]
    fn test_url_path_date() {
        assert_eq!(url_path_date("https://lite.cnn.com/2025/05/06/article-slug"), d(2025, 5, 6));
        assert_eq!(url_path_date("https://example.com/blog/2024-12-31-year-end"), d(2024, 12, 31));
        assert_eq!(url_path_date("https://example.com/posts/1234"), None);
        assert_eq!(url_path_date("https://example.com/2025/99/99/x"), None);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_looks_truncated() {
        let json_eof = r#"{"field": "value"#; // Missing closing brace
        let result: Result<serde_json::Value, _> = serde_json::from_str(json_eof);
        if let Err(e) = result {
            assert!(looks_truncated(&e));
        }
    }
}
