//! Due-date parsing and rendering
//!
//! Due dates arrive as strings. A string with its own offset (RFC 3339) is
//! taken as-is. A string without one is wall-clock time in the deployment's
//! configured offset. A bare date means the end of that day, 23:59.
//! Rendering always includes the offset, so a due date entered as
//! `2025-03-14 18:30` in `-03:00` comes back as `2025-03-14T18:30:00-03:00`.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DueDateError {
    #[error("Invalid due date: {0}")]
    Unparseable(String),

    #[error("Invalid UTC offset: {0}")]
    InvalidOffset(String),
}

/// Parses `+HH:MM`, `-HH:MM`, `+HHMM`, `Z` or `UTC`
pub fn parse_offset(input: &str) -> Result<FixedOffset, DueDateError> {
    let raw = input.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| DueDateError::InvalidOffset(raw.into()));
    }

    let invalid = || DueDateError::InvalidOffset(raw.to_string());

    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => return Err(invalid()),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Parses a due-date string, interpreting offset-less input in `default_offset`
pub fn parse_due_date(
    input: &str,
    default_offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, DueDateError> {
    let raw = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt);
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| NaiveTime::from_hms_opt(23, 59, 0).map(|t| date.and_time(t)))
        })
        .ok_or_else(|| DueDateError::Unparseable(raw.to_string()))?;

    default_offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| DueDateError::Unparseable(raw.to_string()))
}

/// RFC 3339 with the stored offset
pub fn format_due_date(due: &DateTime<FixedOffset>) -> String {
    due.to_rfc3339()
}
