//! Chore recurrence interval and its duration-string encoding.
//!
//! The server stores the interval between two runs as a fixed layout
//! duration string: `P<days>DT<hours>H<minutes>M<seconds>S`, every field
//! zero-padded to at least two digits (e.g. `P01DT02H03M04S`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ChoreError, ChoreResult};

/// Interval between two executions of a chore.
///
/// Fields are kept exactly as given. No normalization is performed, so
/// 90 minutes is transmitted as `90M`, not folded into an hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChoreFrequency {
    days: u32,
    hours: u32,
    minutes: u32,
    seconds: u32,
}

impl ChoreFrequency {
    /// Create a frequency from its four components.
    #[must_use]
    pub fn new(days: u32, hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            days,
            hours,
            minutes,
            seconds,
        }
    }

    /// Days component.
    pub fn days(&self) -> u32 {
        self.days
    }

    /// Hours component.
    pub fn hours(&self) -> u32 {
        self.hours
    }

    /// Minutes component.
    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// Seconds component.
    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    /// Total length of the interval in seconds.
    pub fn total_seconds(&self) -> u64 {
        u64::from(self.days) * 86_400
            + u64::from(self.hours) * 3_600
            + u64::from(self.minutes) * 60
            + u64::from(self.seconds)
    }

    /// Compare two intervals allowing a drift of `tolerance_seconds`.
    ///
    /// Some server versions hand back a frequency one second off from what
    /// was written. Compare with a tolerance of 1 when checking a round trip
    /// through the server.
    pub fn is_within(&self, other: &Self, tolerance_seconds: u64) -> bool {
        self.total_seconds().abs_diff(other.total_seconds()) <= tolerance_seconds
    }
}

impl Default for ChoreFrequency {
    fn default() -> Self {
        Self::new(1, 0, 0, 0)
    }
}

impl fmt::Display for ChoreFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P{:02}DT{:02}H{:02}M{:02}S",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

impl FromStr for ChoreFrequency {
    type Err = ChoreError;

    fn from_str(s: &str) -> ChoreResult<Self> {
        let invalid = || {
            ChoreError::Format(format!(
                "invalid chore frequency '{s}', expected P<days>DT<hh>H<mm>M<ss>S"
            ))
        };

        let rest = s.strip_prefix('P').ok_or_else(invalid)?;
        let (days, rest) = rest.split_once("DT").ok_or_else(invalid)?;
        let (hours, rest) = rest.split_once('H').ok_or_else(invalid)?;
        let (minutes, rest) = rest.split_once('M').ok_or_else(invalid)?;
        let seconds = rest.strip_suffix('S').ok_or_else(invalid)?;

        Ok(Self {
            days: parse_field(days, 1).ok_or_else(invalid)?,
            hours: parse_field(hours, 2).ok_or_else(invalid)?,
            minutes: parse_field(minutes, 2).ok_or_else(invalid)?,
            seconds: parse_field(seconds, 2).ok_or_else(invalid)?,
        })
    }
}

/// Parse an unsigned decimal field of at least `min_width` digits.
fn parse_field(field: &str, min_width: usize) -> Option<u32> {
    if field.len() < min_width || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

impl TryFrom<String> for ChoreFrequency {
    type Error = ChoreError;

    fn try_from(value: String) -> ChoreResult<Self> {
        value.parse()
    }
}

impl From<ChoreFrequency> for String {
    fn from(frequency: ChoreFrequency) -> Self {
        frequency.to_string()
    }
}
