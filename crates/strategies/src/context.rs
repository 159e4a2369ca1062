// In crates/strategies/src/context.rs

use core_types::{Bar, BarSeries, Timeframe};
use indicators::{IndicatorSet, IndicatorSpec, Line};

use crate::error::EvalError;

type Result<T> = std::result::Result<T, EvalError>;

/// Read-only view a rule evaluates against.
///
/// Every accessor counts `back` bars from the latest one (`back = 0` is the
/// bar the verdict is for) and fails with [`EvalError::Insufficient`] when the
/// requested point is outside the series or still in an indicator's warm-up.
pub struct EvalContext<'a> {
    series: &'a BarSeries,
    indicators: &'a IndicatorSet,
}

impl<'a> EvalContext<'a> {
    pub fn new(series: &'a BarSeries, indicators: &'a IndicatorSet) -> Self {
        Self { series, indicators }
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn timeframe(&self) -> Timeframe {
        self.series.timeframe()
    }

    pub fn bars(&self) -> &'a [Bar] {
        self.series.bars()
    }

    fn index(&self, back: usize) -> Result<usize> {
        self.len()
            .checked_sub(back + 1)
            .ok_or(EvalError::Insufficient)
    }

    pub fn bar(&self, back: usize) -> Result<&'a Bar> {
        let i = self.index(back)?;
        Ok(&self.series.bars()[i])
    }

    pub fn close(&self, back: usize) -> Result<f64> {
        Ok(self.bar(back)?.close)
    }

    pub fn open(&self, back: usize) -> Result<f64> {
        Ok(self.bar(back)?.open)
    }

    pub fn high(&self, back: usize) -> Result<f64> {
        Ok(self.bar(back)?.high)
    }

    pub fn low(&self, back: usize) -> Result<f64> {
        Ok(self.bar(back)?.low)
    }

    pub fn volume(&self, back: usize) -> Result<f64> {
        Ok(self.bar(back)?.volume as f64)
    }

    /// `count` consecutive bars ending `back` bars before the latest, oldest
    /// first.
    pub fn window(&self, back: usize, count: usize) -> Result<&'a [Bar]> {
        let end = self.index(back)? + 1;
        let start = end.checked_sub(count).ok_or(EvalError::Insufficient)?;
        Ok(&self.series.bars()[start..end])
    }

    pub fn highest_high(&self, back: usize, count: usize) -> Result<f64> {
        Ok(self
            .window(back, count)?
            .iter()
            .map(|b| b.high)
            .fold(f64::MIN, f64::max))
    }

    pub fn lowest_low(&self, back: usize, count: usize) -> Result<f64> {
        Ok(self
            .window(back, count)?
            .iter()
            .map(|b| b.low)
            .fold(f64::MAX, f64::min))
    }

    /// Main line of `spec`.
    pub fn value(&self, spec: &IndicatorSpec, back: usize) -> Result<f64> {
        self.line(spec, Line::Main, back)
    }

    pub fn line(&self, spec: &IndicatorSpec, line: Line, back: usize) -> Result<f64> {
        let series = self
            .indicators
            .line(spec, line)
            .ok_or_else(|| EvalError::MissingIndicator(format!("{spec}/{line:?}")))?;
        let i = self.index(back)?;
        series
            .get(i)
            .copied()
            .flatten()
            .ok_or(EvalError::Insufficient)
    }
}

/// `a` moved from at-or-below `b` to strictly above it.
pub fn crossed_above(prev_a: f64, prev_b: f64, a: f64, b: f64) -> bool {
    prev_a <= prev_b && a > b
}

/// `a` moved from at-or-above `b` to strictly below it.
pub fn crossed_below(prev_a: f64, prev_b: f64, a: f64, b: f64) -> bool {
    prev_a >= prev_b && a < b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::series_from_closes;

    const EMA3: IndicatorSpec = IndicatorSpec::Ema {
        source: indicators::Source::Close,
        period: 3,
    };

    #[test]
    fn accessors_count_back_from_latest() {
        let series = series_from_closes(&[10.0, 11.0, 12.0, 13.0]);
        let set = IndicatorSet::compute(&series, &[EMA3]);
        let ctx = EvalContext::new(&series, &set);

        assert_eq!(ctx.close(0).unwrap(), 13.0);
        assert_eq!(ctx.close(3).unwrap(), 10.0);
        assert_eq!(ctx.close(4), Err(EvalError::Insufficient));
        assert_eq!(ctx.value(&EMA3, 0).unwrap(), 12.0);
        assert_eq!(ctx.value(&EMA3, 2), Err(EvalError::Insufficient));
        assert_eq!(ctx.window(1, 2).unwrap().len(), 2);
        assert_eq!(ctx.window(0, 5), Err(EvalError::Insufficient));
    }

    #[test]
    fn missing_indicator_is_reported() {
        let series = series_from_closes(&[10.0, 11.0]);
        let set = IndicatorSet::compute(&series, &[]);
        let ctx = EvalContext::new(&series, &set);
        assert!(matches!(
            ctx.value(&IndicatorSpec::Obv, 0),
            Err(EvalError::MissingIndicator(_))
        ));
    }

    #[test]
    fn cross_helpers() {
        assert!(crossed_above(1.0, 2.0, 3.0, 2.0));
        assert!(crossed_above(2.0, 2.0, 2.5, 2.0));
        assert!(!crossed_above(3.0, 2.0, 4.0, 2.0));
        assert!(crossed_below(3.0, 2.0, 1.0, 2.0));
        assert!(!crossed_below(1.0, 2.0, 0.5, 2.0));
    }
}
