//! Date literal parsing
//!
//! `{"Date": "..."}` is folded at compile time into epoch milliseconds so
//! that events carrying numeric `created_at` values compare as plain numbers.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::Result;
use crate::error::PredicateCompileError;

#[cfg(test)]
#[path = "date_test.rs"]
mod tests;

/// Naive date-time layouts accepted after RFC 3339 (interpreted as UTC)
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 string into milliseconds since the Unix epoch
///
/// Accepts RFC 3339 (`2021-03-04T05:06:07Z`, `...+02:00`), naive date-times
/// (taken as UTC) and plain dates (UTC midnight).
pub fn parse_epoch_millis(input: &str) -> Result<i64> {
    let s = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }

    match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(date) => date
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc().timestamp_millis())
            .ok_or_else(|| PredicateCompileError::invalid_date(input, "date out of range")),
        Err(e) => Err(PredicateCompileError::invalid_date(input, e.to_string())),
    }
}
