// In crates/strategies/src/lib.rs

//! The strategy catalog and the registry that evaluates it.
//!
//! A strategy is a stateless rule over one symbol's bars and precomputed
//! indicators. The registry looks rules up by id and turns whatever they do,
//! including failing or panicking, into a [`core_types::SignalResult`].

pub mod context;
pub mod error;
pub mod registry;
pub mod rules;

pub use context::{crossed_above, crossed_below, EvalContext};
pub use error::{EvalError, RegistryError};
pub use registry::{Category, Precedence, Rule, StrategyDefinition, StrategyRegistry, Verdict};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use core_types::{normalize, BarSeries, RawBar, Signal, Timeframe};
    use indicators::IndicatorSet;

    use crate::StrategyRegistry;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap()
    }

    /// One-minute bars whose open is the previous close.
    pub fn series_from_closes(closes: &[f64]) -> BarSeries {
        bars_to_series(Timeframe::OneMinute, bars_from_closes(closes))
    }

    pub fn bars_from_closes(closes: &[f64]) -> Vec<RawBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let open = if i == 0 { close } else { closes[i - 1] };
                bar_at(
                    i as i64,
                    open,
                    open.max(close) + 1.0,
                    open.min(close) - 1.0,
                    close,
                    1_000,
                )
            })
            .collect()
    }

    /// A bar `minute` minutes after the test epoch.
    pub fn bar_at(minute: i64, open: f64, high: f64, low: f64, close: f64, volume: i64) -> RawBar {
        RawBar {
            timestamp: start() + Duration::minutes(minute),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn bars_to_series(timeframe: Timeframe, bars: Vec<RawBar>) -> BarSeries {
        normalize("TEST", timeframe, bars).unwrap()
    }

    /// Timeframe of [`market_walk`] bars.
    pub const WALK_TIMEFRAME: Timeframe = Timeframe::FifteenMinutes;
    const WALK_SESSION: usize = 26;

    /// Seeded random walk of 15-minute bars in 26-bar sessions.
    ///
    /// Drift and volatility change every 30 bars, sessions open on a gap,
    /// and some bars are hammers, shooting stars or volume surges. The
    /// generator is a plain LCG so the walk is identical on every platform.
    pub fn market_walk(seed: u64, count: usize) -> Vec<RawBar> {
        let mut state = seed;
        let mut next = move || {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };

        let mut bars = Vec::with_capacity(count);
        let (mut prev, mut drift, mut swing) = (100.0_f64, 0.0, 0.012);
        for i in 0..count {
            if i % 30 == 0 {
                drift = 0.004 * (next() - 0.5);
                swing = if next() < 0.25 { 0.001 } else { 0.012 };
            }
            let (day, slot) = (i / WALK_SESSION, i % WALK_SESSION);
            let minute = (day * 1440 + slot * 15) as i64;

            let mut open = prev;
            if slot == 0 && i > 0 {
                open = prev * (1.0 + 0.06 * (next() - 0.5));
            }
            let close = open * (1.0 + drift + swing * (next() - 0.5));
            let mut high = open.max(close) + close * 0.004 * next();
            let mut low = open.min(close) - close * 0.004 * next();
            let shape = next();
            if shape < 0.04 {
                low = open.min(close) - 3.0 * (close - open).abs() - close * 0.004;
                high = open.max(close);
            } else if shape < 0.08 {
                high = open.max(close) + 3.0 * (close - open).abs() + close * 0.004;
                low = open.min(close);
            }
            let mut volume = 1_000 + (next() * 1_000.0) as i64;
            if next() < 0.1 {
                volume *= 4;
            }
            bars.push(bar_at(minute, open, high, low, close, volume));
            prev = close;
        }
        bars
    }

    /// The signal strategy `id` gives on every prefix of `bars`, shortest
    /// first. Indicators only look backwards, so one set computed over all of
    /// `bars` serves every prefix.
    pub fn signals_over(id: &str, timeframe: Timeframe, bars: &[RawBar]) -> Vec<Signal> {
        let registry = StrategyRegistry::builtin().unwrap();
        let full = bars_to_series(timeframe, bars.to_vec());
        let set = IndicatorSet::compute(&full, &registry.requirements(&[id]).unwrap());
        (1..=bars.len())
            .map(|len| {
                let prefix = bars_to_series(timeframe, bars[..len].to_vec());
                registry.evaluate(id, &prefix, &set).signal
            })
            .collect()
    }

    /// Whether strategy `id` ever buys and ever sells on the seed-20 walk.
    pub fn fires_on_walk(id: &str) -> (bool, bool) {
        let signals = signals_over(id, WALK_TIMEFRAME, &market_walk(20, 800));
        (
            signals.contains(&Signal::Buy),
            signals.contains(&Signal::Sell),
        )
    }
}
