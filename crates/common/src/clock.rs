//! Timestamp utilities for job creation times.
//!
//! Render output paths embed the moment a job was created. The string has
//! to be stable for a given job and safe to use as a directory name on
//! every platform the workers run on, so it avoids `:` and spaces.

use std::fmt::Display;

use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// `strftime` pattern for filesystem-safe timestamps, e.g. `2024-03-07_141503`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";

/// Timezone in which job timestamps are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimestampZone {
    /// The zone of the machine running the compiler.
    #[default]
    Local,
    Utc,
    /// A fixed offset east of UTC, in seconds.
    Fixed { offset_secs: i32 },
}

impl TimestampZone {
    /// Format `instant` in this zone using [`TIMESTAMP_FORMAT`].
    ///
    /// An out-of-range fixed offset falls back to UTC.
    pub fn format(&self, instant: &DateTime<Utc>) -> String {
        match self {
            TimestampZone::Local => format_timestamp_in(instant, &Local),
            TimestampZone::Utc => format_timestamp_in(instant, &Utc),
            TimestampZone::Fixed { offset_secs } => match FixedOffset::east_opt(*offset_secs) {
                Some(offset) => format_timestamp_in(instant, &offset),
                None => format_timestamp_in(instant, &Utc),
            },
        }
    }
}

/// Format a job creation time in the local timezone.
pub fn format_timestamp_local(instant: &DateTime<Utc>) -> String {
    format_timestamp_in(instant, &Local)
}

/// Format a job creation time in an explicit timezone.
pub fn format_timestamp_in<Tz>(instant: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    instant
        .with_timezone(tz)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, 14, 15, 3).unwrap()
    }

    #[test]
    fn test_format_utc() {
        assert_eq!(format_timestamp_in(&instant(), &Utc), "2024-03-07_141503");
        assert_eq!(TimestampZone::Utc.format(&instant()), "2024-03-07_141503");
    }

    #[test]
    fn test_format_fixed_offset_crosses_midnight() {
        let zone = TimestampZone::Fixed {
            offset_secs: 10 * 3600,
        };
        assert_eq!(zone.format(&instant()), "2024-03-08_001503");
    }

    #[test]
    fn test_invalid_offset_falls_back_to_utc() {
        let zone = TimestampZone::Fixed {
            offset_secs: 48 * 3600,
        };
        assert_eq!(zone.format(&instant()), "2024-03-07_141503");
    }

    #[test]
    fn test_local_format_is_filesystem_safe() {
        let formatted = format_timestamp_local(&instant());
        assert_eq!(formatted.len(), "2024-03-07_141503".len());
        assert!(!formatted.contains(':'));
        assert!(!formatted.contains(' '));
    }

    #[test]
    fn test_zone_serde_roundtrip() {
        let zone = TimestampZone::Fixed { offset_secs: -3600 };
        let json = serde_json::to_string(&zone).unwrap();
        assert_eq!(serde_json::from_str::<TimestampZone>(&json).unwrap(), zone);
        assert_eq!(
            serde_json::from_str::<TimestampZone>("\"local\"").unwrap(),
            TimestampZone::Local
        );
    }
}
