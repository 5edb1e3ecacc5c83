//! Capture-time handling: wall clocks, date folders and date-range filtering.
//!
//! Cameras keep a naive wall clock. All filtering and folder naming happens on that wall
//! clock; only when a file's modification time is written back is it resolved to a real
//! instant, using the camera's configured time zone.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::SystemTime;

const DEFAULT_DATE_FORMAT: &str = "%d-%m-%Y";

/// An inclusive range of capture wall-clock times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Spans whole days, from `start` at midnight up to the last moment of `end`.
    pub fn days(start: NaiveDate, end: NaiveDate) -> Self {
        let last_moment =
            NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        Self {
            start: start.and_time(NaiveTime::MIN),
            end: end.and_time(last_moment),
        }
    }

    pub fn contains(&self, captured: &NaiveDateTime) -> bool {
        *captured >= self.start && *captured <= self.end
    }
}

/// Returns true when no range is set or the capture time falls inside it.
pub fn in_range(range: Option<&DateRange>, captured: &NaiveDateTime) -> bool {
    range.is_none_or(|r| r.contains(captured))
}

/// Translates a `dd`/`mm`/`yyyy` date format into a chrono format string.
///
/// Formats missing any of the three tokens are ignored and the default `dd-mm-yyyy` is used.
pub fn date_format_pattern(format: Option<&str>) -> String {
    match format {
        Some(f) if f.contains("yyyy") && f.contains("mm") && f.contains("dd") => f
            .replace("yyyy", "%Y")
            .replace("mm", "%m")
            .replace("dd", "%d"),
        _ => DEFAULT_DATE_FORMAT.to_string(),
    }
}

/// Formats the date folder name for a capture time.
pub fn date_folder(captured: &NaiveDateTime, format: Option<&str>) -> String {
    captured.format(&date_format_pattern(format)).to_string()
}

/// Wall clock of a filesystem timestamp in the host's zone.
///
/// SD cards store local time, so this is the clock the camera displayed at capture.
pub fn local_wall_clock(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

/// Reads an epoch value reported by a camera as its wall clock.
///
/// Cameras report their local clock as if it were UTC, so the value is taken at face value.
pub fn wall_clock_from_epoch(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

/// Resolves a camera wall clock to a real instant in the given zone (host zone when `None`).
pub fn wall_clock_to_system_time(wall_clock: &NaiveDateTime, tz: Option<Tz>) -> Option<SystemTime> {
    match tz {
        Some(tz) => tz
            .from_local_datetime(wall_clock)
            .earliest()
            .map(SystemTime::from),
        None => Local
            .from_local_datetime(wall_clock)
            .earliest()
            .map(SystemTime::from),
    }
}

/// Parses a naive datetime string as written by exiftool (YYYY:MM:DD HH:MM:SS[.fff]).
pub fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    let formats = [
        "%Y:%m:%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y:%m:%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];

    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        // Some firmwares write trailing offsets; the wall clock is the part before it.
        .or_else(|| {
            s.get(..19)
                .and_then(|head| NaiveDateTime::parse_from_str(head, "%Y:%m:%d %H:%M:%S").ok())
        })
}

/// Picks the embedded capture wall clock from numeric exiftool output.
pub fn embedded_capture_time(exif: &Value) -> Option<NaiveDateTime> {
    ["SubSecDateTimeOriginal", "DateTimeOriginal", "CreateDate"]
        .iter()
        .filter_map(|key| exif.get(*key).and_then(Value::as_str))
        .find_map(parse_naive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_day_range_is_inclusive_on_both_ends() {
        let range = DateRange::days(
            NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
        );

        assert!(range.contains(&dt("2023-01-05 00:00:00")));
        assert!(range.contains(&dt("2023-01-05 23:59:59")));
        assert!(!range.contains(&dt("2023-01-06 00:00:00")));
        assert!(!range.contains(&dt("2023-01-04 23:59:59")));
        assert!(in_range(None, &dt("1999-01-01 00:00:00")), "No range accepts all");
    }

    #[test]
    fn test_date_folder_formats() {
        let captured = dt("2023-01-05 14:30:00");
        assert_eq!(date_folder(&captured, None), "05-01-2023");
        assert_eq!(date_folder(&captured, Some("yyyy-mm-dd")), "2023-01-05");
        assert_eq!(date_folder(&captured, Some("dd.mm.yyyy")), "05.01.2023");
        assert_eq!(
            date_folder(&captured, Some("yyyy-mm")),
            "05-01-2023",
            "Formats without a day token fall back to the default"
        );
    }

    #[test]
    fn test_epoch_is_read_as_wall_clock() {
        // 2022-12-31 13:54:00 as reported by the camera
        let wall = wall_clock_from_epoch(1_672_494_840).unwrap();
        assert_eq!(wall, dt("2022-12-31 13:54:00"));
    }

    #[test]
    fn test_wall_clock_resolves_in_camera_zone() {
        let wall = dt("2023-07-01 12:00:00");
        let instant = wall_clock_to_system_time(&wall, Some(chrono_tz::Europe::Amsterdam)).unwrap();
        let utc = DateTime::<chrono::Utc>::from(instant);
        assert_eq!(utc.naive_utc(), dt("2023-07-01 10:00:00"), "CEST is UTC+2");
    }

    #[test]
    fn test_local_wall_clock_round_trips() {
        let wall = dt("2023-03-10 08:15:00");
        let instant = wall_clock_to_system_time(&wall, None).unwrap();
        assert_eq!(local_wall_clock(instant), wall);
    }

    #[test]
    fn test_embedded_capture_time_prefers_original() {
        let exif = json!({
            "CreateDate": "2020:01:01 00:00:00",
            "DateTimeOriginal": "2023:01:05 10:11:12",
        });
        assert_eq!(embedded_capture_time(&exif), Some(dt("2023-01-05 10:11:12")));

        let exif = json!({ "CreateDate": "2023:01:05 10:11:12+01:00" });
        assert_eq!(embedded_capture_time(&exif), Some(dt("2023-01-05 10:11:12")));

        assert_eq!(embedded_capture_time(&json!({})), None);
    }
}
