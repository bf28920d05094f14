//! Order date parsing.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};

use crate::payload::PayloadError;

/// Naive formats, read in store time. `%.f` also accepts a missing fraction.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// JavaScript `Date.toString()` output, e.g. `Sat Mar 02 2024 14:05:11 GMT+0300`.
const JS_FORMAT: &str = "%a %b %d %Y %H:%M:%S GMT%z";

/// Parse a Salla order date.
///
/// Accepts RFC 3339, JavaScript date strings (with or without the trailing
/// `(Zone Name)`) and naive `YYYY-MM-DD HH:MM:SS[.ffffff]`, which is taken to
/// be in `store_offset`.
///
/// # Errors
///
/// Returns `PayloadError::InvalidDate` if no format matches.
pub fn parse_order_date(
    raw: &str,
    store_offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, PayloadError> {
    let trimmed = raw.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(date);
    }

    let js = trimmed.split(" (").next().unwrap_or(trimmed);
    if let Ok(date) = DateTime::parse_from_str(js, JS_FORMAT) {
        return Ok(date);
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .and_then(|naive| store_offset.from_local_datetime(&naive).single())
        .ok_or_else(|| PayloadError::InvalidDate(raw.to_owned()))
}
