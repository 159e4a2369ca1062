//! Technical indicators over a [`BarSeries`].
//!
//! Every indicator is a pure function of the bars it is given and returns one
//! or more [`Series`] aligned index-for-index with those bars. Points inside
//! the warm-up window are `None`. When a series is shorter than an indicator's
//! [`min_history`](IndicatorSpec::min_history) every line is entirely
//! undefined.
//!
//! [`IndicatorSet`] computes each distinct indicator of a requirement list
//! exactly once per series, so strategies that share an indicator share the
//! result.

use std::collections::HashMap;

use core_types::BarSeries;

pub mod momentum;
pub mod patterns;
pub mod series;
pub mod spec;
pub mod trend;
pub mod volatility;
pub mod volume;

pub use series::Series;
pub use spec::{IndicatorSpec, Line, Source};

/// All indicator lines computed for one symbol in one scan.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    len: usize,
    values: HashMap<String, Vec<(Line, Series)>>,
}

impl IndicatorSet {
    pub fn compute(series: &BarSeries, specs: &[IndicatorSpec]) -> Self {
        let bars = series.bars();
        let mut values = HashMap::with_capacity(specs.len());
        for spec in specs {
            values
                .entry(spec.key())
                .or_insert_with(|| spec.compute(bars));
        }
        Self {
            len: bars.len(),
            values,
        }
    }

    /// Number of bars every stored series is aligned to.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct indicators held.
    pub fn indicator_count(&self) -> usize {
        self.values.len()
    }

    pub fn contains(&self, spec: &IndicatorSpec) -> bool {
        self.values.contains_key(&spec.key())
    }

    pub fn line(&self, spec: &IndicatorSpec, line: Line) -> Option<&Series> {
        self.values
            .get(&spec.key())?
            .iter()
            .find(|(l, _)| *l == line)
            .map(|(_, s)| s)
    }

    /// Shorthand for the [`Line::Main`] output.
    pub fn get(&self, spec: &IndicatorSpec) -> Option<&Series> {
        self.line(spec, Line::Main)
    }
}

#[cfg(test)]
pub(crate) fn make_series(closes: &[f64]) -> BarSeries {
    use chrono::{Duration, TimeZone, Utc};
    use core_types::{normalize, RawBar, Timeframe};

    let start = Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap();
    let raw = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            RawBar {
                timestamp: start + Duration::minutes(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect();
    normalize("TEST", Timeframe::OneMinute, raw).unwrap()
}

#[cfg(test)]
pub(crate) fn assert_approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "assert_approx failed: actual={actual}, expected={expected}"
    );
}
