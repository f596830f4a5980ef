//! Publish-date parsing.
//!
//! Visible dates on the platform look like `2024年3月5日`, `2024-03-05` or
//! `2024/03/05`, usually surrounded by other text. Structured metadata carries
//! ISO 8601 timestamps.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Date patterns in the order they are tried. Each captures year, month, day.
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(\d{4})[年\-/](\d{1,2})[月\-/](\d{1,2})日?",
        r"(\d{4})-(\d{2})-(\d{2})",
        r"(\d{4})/(\d{2})/(\d{2})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Find the first valid calendar date in free text.
///
/// Every match of every pattern is tried in order; matches naming an
/// impossible date (`2024-02-30`) are skipped.
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    DATE_PATTERNS.iter().find_map(|re| {
        re.captures_iter(text).find_map(|caps| {
            let year = caps[1].parse::<i32>().ok()?;
            let month = caps[2].parse::<u32>().ok()?;
            let day = caps[3].parse::<u32>().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        })
    })
}

/// Parse an ISO 8601 timestamp or date and return its calendar date.
///
/// Offsets are honoured as written: `2024-03-05T23:00:00-02:00` is March 5th.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
