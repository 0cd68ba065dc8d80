//! Query windows from `--hours`, `--start-time` and `--end-time`.

use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::logs::{LogsError, LogsResult};

/// Upper bound on `--hours` (about ten years).
const MAX_HOURS: u64 = 24 * 366 * 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// `hours` ending at `now`, with explicit bounds taking precedence.
    pub fn resolve(
        hours: u64,
        start: Option<&str>,
        end: Option<&str>,
        now: DateTime<Utc>,
    ) -> LogsResult<Self> {
        let window = chrono::Duration::hours(hours.min(MAX_HOURS) as i64);
        let mut range = TimeRange {
            start: now - window,
            end: now,
        };
        if let Some(spec) = start {
            range.start = parse_time_spec(spec, now)?;
        }
        if let Some(spec) = end {
            range.end = parse_time_spec(spec, now)?;
        }
        if range.start > range.end {
            tracing::warn!(start = %range.start, end = %range.end, "Start time is after end time");
        }
        Ok(range)
    }
}

/// `<n>[smhd]` means that long before `now`; anything else is ISO-8601.
///
/// Timestamps without an offset are taken as local time.
pub fn parse_time_spec(spec: &str, now: DateTime<Utc>) -> LogsResult<DateTime<Utc>> {
    let spec = spec.trim();
    let invalid = || LogsError::InvalidTime(spec.to_string());

    if let Some(unit) = spec.chars().last().filter(|c| "smhd".contains(*c)) {
        let digits = &spec[..spec.len() - 1];
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            let ago: Duration = humantime::parse_duration(&format!("{}{}", digits, unit))
                .map_err(|_| invalid())?;
            let ago = chrono::Duration::from_std(ago).map_err(|_| invalid())?;
            return now.checked_sub_signed(ago).ok_or_else(invalid);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(spec) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(spec, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(spec, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(invalid)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid)
}
