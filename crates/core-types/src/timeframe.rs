// In crates/core-types/src/timeframe.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Bar aggregation interval. The string forms match the data provider's
/// `timeframe` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1Min")]
    OneMinute,
    #[serde(rename = "5Min")]
    FiveMinutes,
    #[serde(rename = "15Min")]
    FifteenMinutes,
    #[serde(rename = "30Min")]
    ThirtyMinutes,
    #[serde(rename = "1Hour")]
    OneHour,
    #[serde(rename = "4Hour")]
    FourHours,
    #[serde(rename = "1Day")]
    OneDay,
}

impl Timeframe {
    pub const ALL: [Timeframe; 7] = [
        Timeframe::OneMinute,
        Timeframe::FiveMinutes,
        Timeframe::FifteenMinutes,
        Timeframe::ThirtyMinutes,
        Timeframe::OneHour,
        Timeframe::FourHours,
        Timeframe::OneDay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::OneMinute => "1Min",
            Timeframe::FiveMinutes => "5Min",
            Timeframe::FifteenMinutes => "15Min",
            Timeframe::ThirtyMinutes => "30Min",
            Timeframe::OneHour => "1Hour",
            Timeframe::FourHours => "4Hour",
            Timeframe::OneDay => "1Day",
        }
    }

    /// Length of one bar in minutes.
    pub fn minutes(&self) -> u32 {
        match self {
            Timeframe::OneMinute => 1,
            Timeframe::FiveMinutes => 5,
            Timeframe::FifteenMinutes => 15,
            Timeframe::ThirtyMinutes => 30,
            Timeframe::OneHour => 60,
            Timeframe::FourHours => 240,
            Timeframe::OneDay => 1440,
        }
    }

    /// How many bars a scan asks for when the request does not say.
    pub fn default_bar_limit(&self) -> usize {
        match self {
            Timeframe::OneMinute => 200,
            Timeframe::FiveMinutes => 300,
            Timeframe::FifteenMinutes => 400,
            Timeframe::ThirtyMinutes | Timeframe::OneHour => 500,
            Timeframe::FourHours => 300,
            Timeframe::OneDay => 200,
        }
    }

    pub fn is_intraday(&self) -> bool {
        !matches!(self, Timeframe::OneDay)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownTimeframe(s.to_string()))
    }
}
