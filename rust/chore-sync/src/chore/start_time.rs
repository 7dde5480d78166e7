//! Absolute chore start time and its timestamp encoding.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{ChoreError, ChoreResult};

/// Wire layout written to the server. The trailing `Z` is a literal; the
/// fields are the chore's wall-clock time and no offset arithmetic is done.
const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Formats accepted when decoding, after any zone suffix is stripped.
const DECODE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Calendar timestamp at which a chore first fires.
///
/// Precision is whole seconds; anything finer is dropped on construction
/// because the wire format cannot carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChoreStartTime {
    datetime: NaiveDateTime,
}

impl ChoreStartTime {
    /// Build a start time from calendar fields.
    ///
    /// Returns [`ChoreError::Validation`] for impossible dates such as
    /// February 30th or hour 24.
    pub fn new(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> ChoreResult<Self> {
        let datetime = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .ok_or_else(|| {
                ChoreError::Validation(format!(
                    "invalid start time {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
                ))
            })?;
        Ok(Self { datetime })
    }

    /// Wrap an existing timestamp, truncating it to whole seconds.
    #[must_use]
    pub fn from_datetime(datetime: NaiveDateTime) -> Self {
        Self {
            datetime: datetime.with_nanosecond(0).unwrap_or(datetime),
        }
    }

    /// The current local wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Local::now().naive_local())
    }

    /// Underlying timestamp.
    pub fn datetime(&self) -> NaiveDateTime {
        self.datetime
    }

    pub fn year(&self) -> i32 {
        self.datetime.year()
    }

    pub fn month(&self) -> u32 {
        self.datetime.month()
    }

    pub fn day(&self) -> u32 {
        self.datetime.day()
    }

    pub fn hour(&self) -> u32 {
        self.datetime.hour()
    }

    pub fn minute(&self) -> u32 {
        self.datetime.minute()
    }

    pub fn second(&self) -> u32 {
        self.datetime.second()
    }

    /// Date part as `YYYY-MM-DD`.
    pub fn date_string(&self) -> String {
        self.datetime.format("%Y-%m-%d").to_string()
    }

    /// Time-of-day part as `HH:MM:SS`.
    pub fn time_string(&self) -> String {
        self.datetime.format("%H:%M:%S").to_string()
    }

    /// Shift the start time forward.
    pub fn add(&self, days: u32, hours: u32, minutes: u32, seconds: u32) -> ChoreResult<Self> {
        let delta = delta(days, hours, minutes, seconds);
        self.datetime
            .checked_add_signed(delta)
            .map(|datetime| Self { datetime })
            .ok_or_else(|| ChoreError::Validation("start time out of range".to_string()))
    }

    /// Shift the start time backward.
    pub fn subtract(
        &self,
        days: u32,
        hours: u32,
        minutes: u32,
        seconds: u32,
    ) -> ChoreResult<Self> {
        let delta = delta(days, hours, minutes, seconds);
        self.datetime
            .checked_sub_signed(delta)
            .map(|datetime| Self { datetime })
            .ok_or_else(|| ChoreError::Validation("start time out of range".to_string()))
    }
}

fn delta(days: u32, hours: u32, minutes: u32, seconds: u32) -> TimeDelta {
    TimeDelta::days(i64::from(days))
        + TimeDelta::hours(i64::from(hours))
        + TimeDelta::minutes(i64::from(minutes))
        + TimeDelta::seconds(i64::from(seconds))
}

/// Remove a trailing `Z` or `±HH:MM` zone designator.
fn strip_zone(s: &str) -> Option<&str> {
    if let Some(stripped) = s.strip_suffix('Z') {
        return Some(stripped);
    }
    let time_start = s.find('T')? + 1;
    match s[time_start..].rfind(['+', '-']) {
        Some(pos) => {
            let (local, offset) = s.split_at(time_start + pos);
            let digits = &offset[1..];
            let valid = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit() || b == b':');
            valid.then_some(local)
        }
        None => Some(s),
    }
}

impl fmt::Display for ChoreStartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.datetime.format(WIRE_FORMAT))
    }
}

impl FromStr for ChoreStartTime {
    type Err = ChoreError;

    fn from_str(s: &str) -> ChoreResult<Self> {
        let invalid = || ChoreError::Format(format!("invalid chore start time '{s}'"));
        let local = strip_zone(s.trim()).ok_or_else(invalid)?;

        DECODE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(local, format).ok())
            .map(Self::from_datetime)
            .ok_or_else(invalid)
    }
}

impl TryFrom<String> for ChoreStartTime {
    type Error = ChoreError;

    fn try_from(value: String) -> ChoreResult<Self> {
        value.parse()
    }
}

impl From<ChoreStartTime> for String {
    fn from(start_time: ChoreStartTime) -> Self {
        start_time.to_string()
    }
}
