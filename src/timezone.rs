use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

/// Default reference offset: UTC+7 (western Indonesia).
pub const DEFAULT_EAST_OFFSET_HOURS: i32 = 7;

const FILTER_FORMAT: &str = "%d-%m-%YT%H:%M:%S";
const ACTIVE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const ACTIVE_TIME_FORMAT_SHORT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeError {
    #[error("timestamp '{raw}' does not match format '{format}'")]
    Parse { raw: String, format: String },
}

/// The fixed zone all catalog timestamps are interpreted in. Carried as a
/// value on application state rather than a process-wide singleton so tests
/// can run against alternate offsets.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceZone {
    offset: FixedOffset,
}

impl ReferenceZone {
    pub fn east_hours(hours: i32) -> anyhow::Result<Self> {
        let offset = FixedOffset::east_opt(hours * 3600)
            .ok_or_else(|| anyhow::anyhow!("timezone offset out of range: {hours}h"))?;
        Ok(Self { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Current instant expressed in the reference zone.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    /// Parses `raw` with `format` and attaches the reference offset. The
    /// wall-clock value is kept as-is: the zone replaces whatever zone the
    /// caller had in mind, it does not convert into it.
    pub fn normalize(&self, raw: &str, format: &str) -> Result<DateTime<FixedOffset>, TimeError> {
        let parse_error = || TimeError::Parse {
            raw: raw.to_string(),
            format: format.to_string(),
        };
        let naive =
            NaiveDateTime::parse_from_str(raw, format).map_err(|_| parse_error())?;
        self.offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(parse_error)
    }

    /// Parses a variant `active_time`, accepting second and minute
    /// resolution. A trailing `Z` is discarded: the reference zone is
    /// authoritative.
    pub fn parse_active_time(&self, raw: &str) -> Result<DateTime<FixedOffset>, TimeError> {
        let trimmed = raw.trim_end_matches('Z');
        self.normalize(trimmed, ACTIVE_TIME_FORMAT)
            .or_else(|_| self.normalize(trimmed, ACTIVE_TIME_FORMAT_SHORT))
            .map_err(|_| TimeError::Parse {
                raw: raw.to_string(),
                format: ACTIVE_TIME_FORMAT.to_string(),
            })
    }

    /// `DD-MM-YYYY` filter string -> start of that day (00:00:00).
    pub fn day_start(&self, date: &str) -> Result<DateTime<FixedOffset>, TimeError> {
        self.normalize(&format!("{date}T00:00:00"), FILTER_FORMAT)
    }

    /// `DD-MM-YYYY` filter string -> end of that day (23:59:59).
    pub fn day_end(&self, date: &str) -> Result<DateTime<FixedOffset>, TimeError> {
        self.normalize(&format!("{date}T23:59:59"), FILTER_FORMAT)
    }
}
