//! Tests for date literal parsing

use super::*;

#[test]
fn test_rfc3339_utc() {
    assert_eq!(parse_epoch_millis("2021-01-01T00:00:00Z").unwrap(), 1_609_459_200_000);
}

#[test]
fn test_rfc3339_with_offset() {
    assert_eq!(
        parse_epoch_millis("2021-01-01T02:00:00+02:00").unwrap(),
        1_609_459_200_000
    );
}

#[test]
fn test_fractional_seconds() {
    assert_eq!(
        parse_epoch_millis("2021-01-01T00:00:00.250Z").unwrap(),
        1_609_459_200_250
    );
}

#[test]
fn test_naive_datetime_is_utc() {
    assert_eq!(parse_epoch_millis("2021-01-01 00:00:01").unwrap(), 1_609_459_201_000);
    assert_eq!(parse_epoch_millis("2021-01-01T00:01").unwrap(), 1_609_459_260_000);
}

#[test]
fn test_plain_date_is_utc_midnight() {
    assert_eq!(parse_epoch_millis("2021-01-01").unwrap(), 1_609_459_200_000);
}

#[test]
fn test_malformed_date_is_rejected() {
    let err = parse_epoch_millis("yesterday").unwrap_err();
    assert!(matches!(err, PredicateCompileError::InvalidDate { .. }));
    assert!(err.to_string().contains("yesterday"));
}

#[test]
fn test_impossible_date_is_rejected() {
    assert!(parse_epoch_millis("2021-02-30").is_err());
}
