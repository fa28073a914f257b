//! Timestamp parsing and local-time formatting.
//!
//! Detection timestamps arrive as free text from several upstream sources.
//! Values carrying an explicit offset are honoured; naive values are read in
//! the configured local offset. Anything unparseable becomes `None` so the
//! caller can drop the row.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Format of the time column in track tables.
pub const TRACK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of per-day keys.
pub const DAY_FORMAT: &str = "%d/%m/%Y";

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parses a detection timestamp.
///
/// Naive timestamps are interpreted in `offset`.
#[must_use]
pub fn parse_timestamp(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Some(stripped) = s.strip_suffix(" UTC") {
        return parse_naive(stripped).map(|naive| naive.and_utc());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(s, fmt) {
            return Some(ts.with_timezone(&Utc));
        }
    }

    let naive = parse_naive(s)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|ts| ts.with_timezone(&Utc))
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Formats a timestamp as naive local time for track tables.
#[must_use]
pub fn format_local(ts: DateTime<Utc>, offset: FixedOffset) -> String {
    ts.with_timezone(&offset)
        .naive_local()
        .format(TRACK_TIME_FORMAT)
        .to_string()
}

/// Local calendar day of a timestamp.
#[must_use]
pub fn local_day(ts: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    ts.with_timezone(&offset).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn brt() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    #[test]
    fn test_parse_rfc3339() {
        let ts = parse_timestamp("2024-05-10T12:30:00-03:00", utc()).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-05-10T15:30:00+00:00");
    }

    #[test]
    fn test_parse_space_separated_with_offset() {
        let ts = parse_timestamp("2024-05-10 12:30:00+00:00", brt()).unwrap();
        assert_eq!(format_local(ts, utc()), "2024-05-10 12:30:00");
    }

    #[test]
    fn test_parse_naive_uses_offset() {
        let ts = parse_timestamp("2024-05-10 12:30:00", brt()).unwrap();
        assert_eq!(format_local(ts, utc()), "2024-05-10 15:30:00");
        assert_eq!(format_local(ts, brt()), "2024-05-10 12:30:00");
    }

    #[test]
    fn test_parse_fractional_and_brazilian() {
        assert!(parse_timestamp("2024-05-10 12:30:00.250", utc()).is_some());
        let ts = parse_timestamp("10/05/2024 08:15:00", utc()).unwrap();
        assert_eq!(format_local(ts, utc()), "2024-05-10 08:15:00");
    }

    #[test]
    fn test_parse_utc_suffix_and_date() {
        let ts = parse_timestamp("2024-05-10 12:30:00 UTC", brt()).unwrap();
        assert_eq!(format_local(ts, utc()), "2024-05-10 12:30:00");
        let day = parse_timestamp("2024-05-10", utc()).unwrap();
        assert_eq!(format_local(day, utc()), "2024-05-10 00:00:00");
    }

    #[test]
    fn test_parse_slash_dated_iso() {
        let ts = parse_timestamp("2024/05/10 08:00:00", utc()).unwrap();
        assert_eq!(format_local(ts, utc()), "2024-05-10 08:00:00");
        let ts = parse_timestamp("2024/05/10 08:00", brt()).unwrap();
        assert_eq!(format_local(ts, utc()), "2024-05-10 11:00:00");
        let day = parse_timestamp("2024/05/10", utc()).unwrap();
        assert_eq!(format_local(day, utc()), "2024-05-10 00:00:00");
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_timestamp("", utc()).is_none());
        assert!(parse_timestamp("   ", utc()).is_none());
        assert!(parse_timestamp("not a date", utc()).is_none());
        assert!(parse_timestamp("NaT", utc()).is_none());
    }

    #[test]
    fn test_local_day_crosses_midnight() {
        let ts = parse_timestamp("2024-03-01T01:00:00Z", utc()).unwrap();
        assert_eq!(local_day(ts, utc()).format(DAY_FORMAT).to_string(), "01/03/2024");
        assert_eq!(local_day(ts, brt()).format(DAY_FORMAT).to_string(), "29/02/2024");
    }
}
