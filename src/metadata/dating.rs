//! Capture date resolution.
//!
//! Exactly one source decides a photo's year, month and date:
//!
//! 1. the embedded capture timestamp,
//! 2. a `DSC_YYYY-MM-DD` stamp anywhere in the filename,
//! 3. the year directory the file sits in, pinned to January 1st.
//!
//! Only the first source yields a capture instant; the others sort with
//! timestamp 0.

use chrono::{Datelike, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

static FILENAME_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"DSC_(\d{4})-(\d{2})-(\d{2})").expect("valid regex"));

/// EXIF date layout (`2024:05:01 10:00:00`).
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    Embedded,
    Filename,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDate {
    pub year: String,
    pub month: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// Epoch seconds, UTC. Zero unless the date came from embedded metadata.
    pub timestamp: i64,
    pub source: DateSource,
}

/// Parse an EXIF timestamp, ignoring anything after the seconds
/// (sub-second digits, a UTC offset). The value is read as UTC.
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    let head = raw.trim().get(..19)?;
    NaiveDateTime::parse_from_str(head, EXIF_DATETIME_FORMAT).ok()
}

pub fn resolve_capture_date(
    captured: Option<NaiveDateTime>,
    filename: &str,
    dir_year: &str,
) -> CaptureDate {
    if let Some(taken) = captured {
        return CaptureDate {
            year: format!("{:04}", taken.year()),
            month: format!("{:02}", taken.month()),
            date: taken.format("%Y-%m-%d").to_string(),
            timestamp: taken.and_utc().timestamp(),
            source: DateSource::Embedded,
        };
    }

    if let Some(caps) = FILENAME_DATE.captures(filename) {
        let (year, month, day) = (&caps[1], &caps[2], &caps[3]);
        return CaptureDate {
            year: year.to_string(),
            month: month.to_string(),
            date: format!("{year}-{month}-{day}"),
            timestamp: 0,
            source: DateSource::Filename,
        };
    }

    CaptureDate {
        year: dir_year.to_string(),
        month: "01".to_string(),
        date: format!("{dir_year}-01-01"),
        timestamp: 0,
        source: DateSource::Directory,
    }
}
