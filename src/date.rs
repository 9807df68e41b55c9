use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::error::{Error, Result};

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

pub fn yyyymmdd(date: &NaiveDate) -> String {
    format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())
}

/// Parse a timestamp cell as written by the API.
///
/// Accepts `YYYY-MM-DD HH:MM:SS`, ISO-8601 with `T` and an optional `Z` or offset,
/// fractional seconds, and plain `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let t = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Ok(dt.with_timezone(&Utc).naive_utc());
    }

    let naive = t.trim_end_matches('Z');
    let naive = match naive.split_once('.') {
        Some((head, frac)) if frac.chars().all(|c| c.is_ascii_digit()) => head,
        _ => naive,
    };
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Ok(dt);
        }
    }

    if let Ok(d) = NaiveDate::parse_from_str(naive, "%Y-%m-%d") {
        return Ok(d.and_time(chrono::NaiveTime::MIN));
    }

    Err(Error::InvalidRequest(format!("unsupported timestamp: {t}")))
}

/// Parse a forecast date argument.
///
/// - `"YYYYMMDD"` or `"YYYYMMDDHH"` are passed through after validation
/// - `"YYYY-MM-DD"` is converted to `YYYYMMDD`
/// - an integer <= 0 means today + delta days
pub fn parse_forecast_date(s: &str, now: DateTime<Utc>) -> Result<String> {
    let trimmed = s.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        if n <= 0 {
            let d = now.date_naive() + Duration::days(n);
            return Ok(yyyymmdd(&d));
        }
        if trimmed.len() == 8 || trimmed.len() == 10 {
            let d = NaiveDate::parse_from_str(&trimmed[0..8], "%Y%m%d").map_err(|_| {
                Error::InvalidRequest(format!("invalid YYYYMMDD date: {trimmed}"))
            })?;
            if trimmed.len() == 10 {
                let hour: u32 = trimmed[8..10].parse().map_err(|_| {
                    Error::InvalidRequest(format!("invalid forecast hour: {trimmed}"))
                })?;
                if hour > 23 {
                    return Err(Error::InvalidRequest(format!(
                        "invalid forecast hour: {trimmed}"
                    )));
                }
                return Ok(format!("{}{hour:02}", yyyymmdd(&d)));
            }
            return Ok(yyyymmdd(&d));
        }
    }

    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(yyyymmdd(&d));
    }

    Err(Error::InvalidRequest(format!(
        "date must be YYYYMMDD or YYYYMMDDHH, got {trimmed}"
    )))
}

/// Label a zero-based day of year the way the seasonal product is displayed (`Jan 01`).
///
/// `None` for days past 365.
pub fn day_of_year_label(day_of_year: u32) -> Option<String> {
    if day_of_year > 365 {
        return None;
    }
    // 1900 is not a leap year; day 365 wraps onto Dec 31 like the service does.
    let ordinal = day_of_year.checked_add(1)?.min(365);
    NaiveDate::from_yo_opt(1900, ordinal).map(|d| d.format("%b %d").to_string())
}
