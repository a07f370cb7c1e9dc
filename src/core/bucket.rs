//! Time granularities and the bucket labels derived from timestamps.

use crate::error::{Result, SeasonalityError};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Formats tried, in order, for timestamps without an explicit offset.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Time partition used to bucket transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Hour of day, 0–23.
    Hour,
    /// Day of month, 1–31.
    Day,
    /// Day of week, Monday first.
    Weekday,
    /// ISO week number, 1–53.
    Week,
    /// Week within the month, `day / 7 + 1`.
    WeekOfMonth,
    /// Calendar month, 1–12.
    Month,
}

impl Granularity {
    /// All granularities in display order.
    pub const ALL: [Granularity; 6] = [
        Granularity::Hour,
        Granularity::Day,
        Granularity::Weekday,
        Granularity::Week,
        Granularity::WeekOfMonth,
        Granularity::Month,
    ];

    /// Short name used in column headers and log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Weekday => "weekday",
            Granularity::Week => "week",
            Granularity::WeekOfMonth => "week_of_month",
            Granularity::Month => "month",
        }
    }

    /// Inclusive range of ordinals this granularity can produce.
    pub fn ordinal_range(&self) -> (u32, u32) {
        match self {
            Granularity::Hour => (0, 23),
            Granularity::Day => (1, 31),
            Granularity::Weekday => (0, 6),
            Granularity::Week => (1, 53),
            Granularity::WeekOfMonth => (1, 5),
            Granularity::Month => (1, 12),
        }
    }

    /// Every bucket of this granularity in canonical order.
    pub fn buckets(&self) -> Vec<Bucket> {
        let (lo, hi) = self.ordinal_range();
        (lo..=hi).map(|ordinal| Bucket::new(*self, ordinal)).collect()
    }

    /// Bucket for an already-parsed timestamp.
    pub fn bucket_of(&self, ts: &NaiveDateTime) -> Bucket {
        let ordinal = match self {
            Granularity::Hour => ts.hour(),
            Granularity::Day => ts.day(),
            Granularity::Weekday => ts.weekday().num_days_from_monday(),
            Granularity::Week => ts.iso_week().week(),
            Granularity::WeekOfMonth => ts.day() / 7 + 1,
            Granularity::Month => ts.month(),
        };
        Bucket::new(*self, ordinal)
    }

    /// Parse `raw` and derive its bucket.
    pub fn bucketize(&self, raw: &str) -> Result<Bucket> {
        parse_timestamp(raw).map(|ts| self.bucket_of(&ts))
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Granularity {
    type Err = SeasonalityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "hour" | "hourly" => Ok(Granularity::Hour),
            "day" | "daily" => Ok(Granularity::Day),
            "weekday" => Ok(Granularity::Weekday),
            "week" | "weekly" => Ok(Granularity::Week),
            "week_of_month" | "weekly_month" => Ok(Granularity::WeekOfMonth),
            "month" | "monthly" => Ok(Granularity::Month),
            other => Err(SeasonalityError::InvalidParameter(format!(
                "unknown granularity {other:?}"
            ))),
        }
    }
}

/// A discrete time-partition label.
///
/// Buckets order by granularity and then by ordinal, so weekdays sort
/// Monday through Sunday and every other granularity sorts numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Bucket {
    granularity: Granularity,
    ordinal: u32,
}

impl Bucket {
    pub fn new(granularity: Granularity, ordinal: u32) -> Self {
        Self {
            granularity,
            ordinal,
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Numeric position within the granularity (weekday: 0 = Monday).
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// The weekday this bucket stands for, if it is a weekday bucket.
    pub fn weekday(&self) -> Option<Weekday> {
        if self.granularity != Granularity::Weekday {
            return None;
        }
        match self.ordinal {
            0 => Some(Weekday::Mon),
            1 => Some(Weekday::Tue),
            2 => Some(Weekday::Wed),
            3 => Some(Weekday::Thu),
            4 => Some(Weekday::Fri),
            5 => Some(Weekday::Sat),
            6 => Some(Weekday::Sun),
            _ => None,
        }
    }

    /// Human-readable label: the weekday name or the ordinal.
    pub fn label(&self) -> String {
        match self.weekday() {
            Some(day) => weekday_name(day).to_string(),
            None => self.ordinal.to_string(),
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parse a transaction timestamp.
///
/// RFC 3339 timestamps are converted to UTC; naive timestamps are taken
/// as-is. A bare date is treated as midnight.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(SeasonalityError::InvalidTimestamp {
            value: raw.to_string(),
            reason: "empty value".to_string(),
        });
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.naive_utc());
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(ts);
        }
    }

    for format in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            if let Some(ts) = date.and_hms_opt(0, 0, 0) {
                return Ok(ts);
            }
        }
    }

    Err(SeasonalityError::InvalidTimestamp {
        value: raw.to_string(),
        reason: "unrecognised timestamp format".to_string(),
    })
}
