//! The built-in strategy catalog, one module per category.
//!
//! Each rule looks only at the latest bar (and the bars before it) and
//! reports whether its buy and/or sell condition holds there.

use core_types::Bar;
use indicators::{IndicatorSpec, Line, Source};

use crate::context::EvalContext;
use crate::error::EvalError;
use crate::registry::StrategyDefinition;

pub mod breakout;
pub mod hybrid;
pub mod mean_reversion;
pub mod momentum;
pub mod oscillators;
pub mod patterns;
pub mod trend;
pub mod volume;

pub static CATALOG: [&[StrategyDefinition]; 8] = [
    momentum::STRATEGIES,
    trend::STRATEGIES,
    mean_reversion::STRATEGIES,
    breakout::STRATEGIES,
    volume::STRATEGIES,
    oscillators::STRATEGIES,
    patterns::STRATEGIES,
    hybrid::STRATEGIES,
];

pub(crate) type Result<T> = std::result::Result<T, EvalError>;

// --- Shared indicator parameters ---

pub(crate) const RSI14: IndicatorSpec = IndicatorSpec::Rsi { period: 14 };
pub(crate) const VOLUME_SMA20: IndicatorSpec = IndicatorSpec::Sma {
    source: Source::Volume,
    period: 20,
};
pub(crate) const MACD: IndicatorSpec = IndicatorSpec::Macd {
    fast: 12,
    slow: 26,
    signal: 9,
};
pub(crate) const ADX14: IndicatorSpec = IndicatorSpec::Adx { period: 14 };
pub(crate) const BOLLINGER: IndicatorSpec = IndicatorSpec::Bollinger {
    period: 20,
    std_dev: 2.0,
};
pub(crate) const KELTNER: IndicatorSpec = IndicatorSpec::Keltner {
    ema_period: 20,
    atr_period: 10,
    multiplier: 2.0,
};
pub(crate) const MFI14: IndicatorSpec = IndicatorSpec::Mfi { period: 14 };
pub(crate) const SUPERTREND: IndicatorSpec = IndicatorSpec::SuperTrend {
    period: 10,
    factor: 3.0,
};
pub(crate) const PSAR: IndicatorSpec = IndicatorSpec::Psar {
    step: 0.02,
    max_step: 0.2,
};

pub(crate) const fn ema(period: usize) -> IndicatorSpec {
    IndicatorSpec::Ema {
        source: Source::Close,
        period,
    }
}

pub(crate) const EMA9: IndicatorSpec = ema(9);
pub(crate) const EMA20: IndicatorSpec = ema(20);
pub(crate) const EMA21: IndicatorSpec = ema(21);
pub(crate) const EMA50: IndicatorSpec = ema(50);
pub(crate) const EMA200: IndicatorSpec = ema(200);
pub(crate) const RIBBON: [IndicatorSpec; 5] = [ema(8), ema(13), ema(21), ema(34), ema(55)];

// --- Shared conditions ---

/// Latest volume is above `multiplier` times its 20-bar average.
pub(crate) fn volume_spike(ctx: &EvalContext<'_>, multiplier: f64) -> Result<bool> {
    Ok(ctx.volume(0)? > multiplier * ctx.value(&VOLUME_SMA20, 0)?)
}

/// (previous, latest) values of one indicator line.
pub(crate) fn pair(ctx: &EvalContext<'_>, spec: &IndicatorSpec, line: Line) -> Result<(f64, f64)> {
    Ok((ctx.line(spec, line, 1)?, ctx.line(spec, line, 0)?))
}

pub(crate) fn is_bullish(bar: &Bar) -> bool {
    bar.close > bar.open
}

pub(crate) fn is_bearish(bar: &Bar) -> bool {
    bar.close < bar.open
}

/// Small body near the top of the range with a long lower shadow.
pub(crate) fn is_hammer(bar: &Bar) -> bool {
    let range = bar.high - bar.low;
    if range <= 0.0 {
        return false;
    }
    let body = (bar.close - bar.open).abs();
    let lower = bar.open.min(bar.close) - bar.low;
    let upper = bar.high - bar.open.max(bar.close);
    lower >= 2.0 * body && lower >= 0.5 * range && upper <= 0.25 * range
}

/// Mirror image of [`is_hammer`].
pub(crate) fn is_shooting_star(bar: &Bar) -> bool {
    let range = bar.high - bar.low;
    if range <= 0.0 {
        return false;
    }
    let body = (bar.close - bar.open).abs();
    let lower = bar.open.min(bar.close) - bar.low;
    let upper = bar.high - bar.open.max(bar.close);
    upper >= 2.0 * body && upper >= 0.5 * range && lower <= 0.25 * range
}

/// Price closes below every close of the previous `lookback` bars while RSI
/// holds above its reading at the lowest of those closes.
pub(crate) fn bullish_rsi_divergence(ctx: &EvalContext<'_>, rsi: &IndicatorSpec, lookback: usize) -> Result<bool> {
    let mut low_back = 1;
    for back in 1..=lookback {
        if ctx.close(back)? < ctx.close(low_back)? {
            low_back = back;
        }
    }
    Ok(ctx.close(0)? < ctx.close(low_back)? && ctx.value(rsi, 0)? > ctx.value(rsi, low_back)?)
}

/// Price closes above every close of the previous `lookback` bars while RSI
/// stays below its reading at the highest of those closes.
pub(crate) fn bearish_rsi_divergence(ctx: &EvalContext<'_>, rsi: &IndicatorSpec, lookback: usize) -> Result<bool> {
    let mut high_back = 1;
    for back in 1..=lookback {
        if ctx.close(back)? > ctx.close(high_back)? {
            high_back = back;
        }
    }
    Ok(ctx.close(0)? > ctx.close(high_back)? && ctx.value(rsi, 0)? < ctx.value(rsi, high_back)?)
}

/// All ribbon EMAs stacked fastest-on-top (`Some(true)`), slowest-on-top
/// (`Some(false)`) or tangled (`None`).
pub(crate) fn ribbon_alignment(ctx: &EvalContext<'_>, back: usize) -> Result<Option<bool>> {
    let values = RIBBON
        .iter()
        .map(|spec| ctx.value(spec, back))
        .collect::<Result<Vec<f64>>>()?;
    if values.windows(2).all(|w| w[0] > w[1]) {
        Ok(Some(true))
    } else if values.windows(2).all(|w| w[0] < w[1]) {
        Ok(Some(false))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc::now(),
            open,
            high,
            low,
            close,
            volume: 100,
        }
    }

    #[test]
    fn hammer_shapes() {
        assert!(is_hammer(&candle(9.6, 10.0, 8.0, 9.9)));
        assert!(!is_hammer(&candle(8.2, 10.0, 8.0, 9.9)));
        assert!(is_shooting_star(&candle(8.4, 10.0, 8.0, 8.1)));
        assert!(!is_shooting_star(&candle(9.0, 9.0, 9.0, 9.0)));
    }

    #[test]
    fn catalog_has_unique_ids() {
        let total: usize = CATALOG.iter().map(|group| group.len()).sum();
        let mut ids: Vec<&str> = CATALOG.iter().flat_map(|g| g.iter().map(|d| d.id)).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert_eq!(total, 55);
    }
}
