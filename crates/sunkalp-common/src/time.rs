//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Timestamp parsing and display helpers."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use chrono::{DateTime, Local, TimeZone, Utc};

/// Placeholder shown when a sample carries no usable timestamp.
pub const UNKNOWN_TIME: &str = "--:--";

/// Parse an ISO-8601 / RFC 3339 timestamp as emitted by the telemetry feed.
pub fn parse_feed_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Hour and minute in the given timezone, as shown on chart axes.
pub fn format_clock<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    instant.with_timezone(tz).format("%H:%M").to_string()
}

/// Hour and minute in the local timezone.
pub fn format_local_clock(instant: &DateTime<Utc>) -> String {
    format_clock(instant, &Local)
}

/// Full local wall-clock time used for "last synced" banners.
pub fn format_sync_time(instant: &DateTime<Utc>) -> String {
    instant.with_timezone(&Local).format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn parses_zulu_timestamps() {
        let ts = parse_feed_timestamp("2023-10-27T10:00:00Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2023-10-27T10:00:00+00:00");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_feed_timestamp("yesterday").is_none());
        assert!(parse_feed_timestamp("").is_none());
    }

    #[test]
    fn clock_respects_timezone() {
        let ts = parse_feed_timestamp("2023-10-27T10:05:00Z").unwrap();
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        assert_eq!(format_clock(&ts, &ist), "15:35");
        assert_eq!(format_clock(&ts, &Utc), "10:05");
    }
}
