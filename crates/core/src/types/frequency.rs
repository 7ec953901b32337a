//! Subscription delivery frequency.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unit of a subscription interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Day,
    Week,
    Month,
}

impl IntervalUnit {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

/// How often a subscription line ships, e.g. every 4 weeks.
///
/// The wire form used by the product form and the custom checkout is
/// `"<interval>_<unit>"`, for example `"4_week"` or `"30_day"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Frequency {
    pub interval: u16,
    pub unit: IntervalUnit,
}

/// A frequency string that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid subscription frequency: {0}")]
pub struct FrequencyError(pub String);

impl Frequency {
    #[must_use]
    pub const fn new(interval: u16, unit: IntervalUnit) -> Self {
        Self { interval, unit }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.interval, self.unit.as_str())
    }
}

impl FromStr for Frequency {
    type Err = FrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || FrequencyError(s.to_owned());
        let (interval, unit) = s.split_once('_').ok_or_else(err)?;
        let interval: u16 = interval.parse().map_err(|_| err())?;
        if interval == 0 {
            return Err(err());
        }
        let unit = match unit.trim_end_matches('s') {
            "day" => IntervalUnit::Day,
            "week" => IntervalUnit::Week,
            "month" => IntervalUnit::Month,
            _ => return Err(err()),
        };
        Ok(Self { interval, unit })
    }
}

impl TryFrom<String> for Frequency {
    type Error = FrequencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(frequency: Frequency) -> Self {
        frequency.to_string()
    }
}
