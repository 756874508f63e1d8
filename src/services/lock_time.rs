use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::AppError;

const FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parses a pool lock time given either as `YYYY-MM-DD HH:MM[:SS]` or as an
/// ISO-8601 timestamp (`T` separator, optional fraction, optional `Z`).
/// Times without an offset are taken as UTC.
pub fn parse_lock_time(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let trimmed = raw.trim();

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(with_offset.with_timezone(&Utc));
    }

    let mut normalized = trimmed.trim_end_matches('Z').replacen('T', " ", 1);
    if let Some(dot) = normalized.find('.') {
        normalized.truncate(dot);
    }

    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&normalized, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Invalid lock_time format. Use YYYY-MM-DD HH:MM:SS or ISO format: {raw}"
            ))
        })
}
