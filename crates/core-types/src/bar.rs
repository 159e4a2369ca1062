// In crates/core-types/src/bar.rs

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, Serializer};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::timeframe::Timeframe;

/// A single validated OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// (high + low) / 2
    pub fn median_price(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

/// A bar exactly as a provider returned it. Nothing about it is trusted yet.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, Deserialize)]
pub struct RawBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Time-ordered bars for one symbol at one timeframe.
///
/// The only way to obtain a `BarSeries` is [`normalize`], so every series in
/// the system has strictly increasing timestamps and validated prices.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    symbol: String,
    timeframe: Timeframe,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}

// On the wire a series is just its bar list; the symbol is the map key.
impl Serialize for BarSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.bars)
    }
}

/// Turns provider bars into a [`BarSeries`].
///
/// 1. Stable-sorts by timestamp.
/// 2. Collapses equal timestamps, keeping the last one in input order.
/// 3. Rejects non-finite or non-positive prices and negative volume.
///
/// An empty input produces an empty series.
pub fn normalize(
    symbol: impl Into<String>,
    timeframe: Timeframe,
    raw_bars: Vec<RawBar>,
) -> Result<BarSeries> {
    let symbol = symbol.into();
    let mut raw_bars = raw_bars;
    raw_bars.sort_by_key(|b| b.timestamp);

    let mut deduped: Vec<RawBar> = Vec::with_capacity(raw_bars.len());
    for bar in raw_bars {
        match deduped.last_mut() {
            Some(prev) if prev.timestamp == bar.timestamp => *prev = bar,
            _ => deduped.push(bar),
        }
    }

    let bars = deduped
        .into_iter()
        .enumerate()
        .map(|(index, raw)| validate(&symbol, index, raw))
        .collect::<Result<Vec<Bar>>>()?;

    if let Some(index) = bars
        .windows(2)
        .position(|w| w[0].timestamp >= w[1].timestamp)
    {
        return Err(malformed(&symbol, index + 1, "timestamps not strictly increasing"));
    }

    Ok(BarSeries {
        symbol,
        timeframe,
        bars,
    })
}

fn validate(symbol: &str, index: usize, raw: RawBar) -> Result<Bar> {
    for (field, value) in [
        ("open", raw.open),
        ("high", raw.high),
        ("low", raw.low),
        ("close", raw.close),
    ] {
        if !value.is_finite() {
            return Err(malformed(symbol, index, &format!("{field} is not finite")));
        }
        if value <= 0.0 {
            return Err(malformed(symbol, index, &format!("{field} must be positive, got {value}")));
        }
    }
    if raw.volume < 0 {
        return Err(malformed(symbol, index, &format!("negative volume {}", raw.volume)));
    }

    Ok(Bar {
        timestamp: raw.timestamp,
        open: raw.open,
        high: raw.high,
        low: raw.low,
        close: raw.close,
        volume: raw.volume as u64,
    })
}

fn malformed(symbol: &str, index: usize, reason: &str) -> Error {
    Error::MalformedData {
        symbol: symbol.to_string(),
        index,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn ts(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap() + Duration::minutes(minute)
    }

    fn raw(minute: i64, close: f64) -> RawBar {
        RawBar {
            timestamp: ts(minute),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn sorts_out_of_order_input() {
        let series = normalize("AAPL", Timeframe::OneMinute, vec![raw(2, 12.0), raw(0, 10.0), raw(1, 11.0)]).unwrap();
        let closes = series.closes();
        assert_eq!(closes, vec![10.0, 11.0, 12.0]);
        assert_eq!(series.symbol(), "AAPL");
    }

    #[test]
    fn duplicate_timestamps_keep_last_occurrence() {
        let series = normalize(
            "MSFT",
            Timeframe::FiveMinutes,
            vec![raw(0, 10.0), raw(1, 11.0), raw(0, 99.0)],
        )
        .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].close, 99.0);
    }

    #[test]
    fn empty_input_is_an_empty_series() {
        let series = normalize("TSLA", Timeframe::OneDay, Vec::new()).unwrap();
        assert!(series.is_empty());
        assert!(series.last().is_none());
    }

    #[test]
    fn rejects_non_positive_prices() {
        let mut bad = raw(1, 10.0);
        bad.low = 0.0;
        let err = normalize("SPY", Timeframe::OneMinute, vec![raw(0, 10.0), bad]).unwrap_err();
        match err {
            Error::MalformedData { symbol, index, .. } => {
                assert_eq!(symbol, "SPY");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_nan_and_negative_volume() {
        let mut nan = raw(0, 10.0);
        nan.close = f64::NAN;
        assert!(normalize("SPY", Timeframe::OneMinute, vec![nan]).is_err());

        let mut neg = raw(0, 10.0);
        neg.volume = -5;
        assert!(normalize("SPY", Timeframe::OneMinute, vec![neg]).is_err());
    }

    #[test]
    fn serializes_as_bar_list() {
        let series = normalize("AAPL", Timeframe::OneMinute, vec![raw(0, 10.0)]).unwrap();
        let json = serde_json::to_value(&series).unwrap();
        let first = &json.as_array().unwrap()[0];
        assert_eq!(first["close"], 10.0);
        assert_eq!(first["volume"], 1_000);
        assert!(first["timestamp"].is_string());
    }

    proptest! {
        #[test]
        fn normalized_timestamps_strictly_increase(minutes in prop::collection::vec(0i64..50, 0..80)) {
            let raw_bars: Vec<RawBar> = minutes.iter().map(|m| raw(*m, 5.0 + *m as f64)).collect();
            let series = normalize("QQQ", Timeframe::OneMinute, raw_bars).unwrap();

            let mut distinct = minutes.clone();
            distinct.sort_unstable();
            distinct.dedup();
            prop_assert_eq!(series.len(), distinct.len());
            for pair in series.bars().windows(2) {
                prop_assert!(pair[0].timestamp < pair[1].timestamp);
            }
        }
    }
}
