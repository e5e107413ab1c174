use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Quiz time limit in whole seconds. Zero means "no limit".
///
/// Values are capped at `i64::MAX` seconds so that every limit fits the `BIGINT` column.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(try_from = "u64", into = "u64")]
pub struct TimeLimit(u64);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidTimeLimit {
    #[error("time limit must be a non-negative number of seconds")]
    Malformed,
    #[error("stored time limit {0} is negative")]
    Negative(i64),
    #[error("time limit {0} exceeds the largest storable value")]
    TooLarge(u64),
}

impl TimeLimit {
    pub const UNLIMITED: TimeLimit = TimeLimit(0);
    pub const MAX_SECS: u64 = i64::MAX as u64;

    /// Saturates at `MAX_SECS`. Untrusted input goes through `FromStr` or serde instead.
    pub const fn from_secs(secs: u64) -> Self {
        if secs > Self::MAX_SECS {
            TimeLimit(Self::MAX_SECS)
        } else {
            TimeLimit(secs)
        }
    }

    pub const fn from_mins(mins: u64) -> Self {
        Self::from_secs(mins.saturating_mul(60))
    }

    pub fn as_secs(self) -> u64 {
        self.0
    }

    pub fn is_unlimited(self) -> bool {
        self.0 == 0
    }

    pub fn from_db(value: i64) -> Result<Self, InvalidTimeLimit> {
        u64::try_from(value)
            .map(TimeLimit)
            .map_err(|_| InvalidTimeLimit::Negative(value))
    }

    pub fn to_db(self) -> i64 {
        // every constructor keeps the value within MAX_SECS
        self.0 as i64
    }
}

impl TryFrom<u64> for TimeLimit {
    type Error = InvalidTimeLimit;

    fn try_from(secs: u64) -> Result<Self, Self::Error> {
        if secs > Self::MAX_SECS {
            Err(InvalidTimeLimit::TooLarge(secs))
        } else {
            Ok(TimeLimit(secs))
        }
    }
}

impl From<TimeLimit> for u64 {
    fn from(limit: TimeLimit) -> u64 {
        limit.0
    }
}

impl FromStr for TimeLimit {
    type Err = InvalidTimeLimit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("none") {
            return Ok(TimeLimit::UNLIMITED);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidTimeLimit::Malformed);
        }
        let secs: u64 = s.parse().map_err(|_| InvalidTimeLimit::Malformed)?;
        TimeLimit::try_from(secs)
    }
}

impl fmt::Display for TimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unlimited() {
            return f.write_str("no limit");
        }
        let hours = self.0 / 3600;
        let mins = (self.0 % 3600) / 60;
        let secs = self.0 % 60;

        let mut parts = Vec::new();
        for (n, unit) in [(hours, "hour"), (mins, "min"), (secs, "sec")] {
            match n {
                0 => {}
                1 => parts.push(format!("1 {unit}")),
                n => parts.push(format!("{n} {unit}s")),
            }
        }
        f.write_str(&parts.join(" "))
    }
}
