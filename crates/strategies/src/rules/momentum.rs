use indicators::{IndicatorSpec, Line};

use super::{pair, volume_spike, Result, ADX14, MACD, MFI14, RSI14, VOLUME_SMA20};
use crate::context::{crossed_above, crossed_below, EvalContext};
use crate::registry::{Category, Precedence, StrategyDefinition, Verdict};

const TRIX: IndicatorSpec = IndicatorSpec::Trix {
    period: 15,
    signal: 9,
};
const VORTEX: IndicatorSpec = IndicatorSpec::Vortex { period: 14 };

pub const STRATEGIES: &[StrategyDefinition] = &[
    StrategyDefinition {
        id: "Momentum Trading",
        category: Category::Momentum,
        requires: &[RSI14, VOLUME_SMA20],
        precedence: Precedence::StandAside,
        assess: momentum_trading,
    },
    StrategyDefinition {
        id: "MACD Bullish ADX",
        category: Category::Momentum,
        requires: &[MACD, ADX14],
        precedence: Precedence::StandAside,
        assess: macd_bullish_adx,
    },
    StrategyDefinition {
        id: "ADX Rising MFI Surge",
        category: Category::Momentum,
        requires: &[ADX14, MFI14],
        precedence: Precedence::StandAside,
        assess: adx_rising_mfi_surge,
    },
    StrategyDefinition {
        id: "TRIX OBV",
        category: Category::Momentum,
        requires: &[TRIX, IndicatorSpec::Obv],
        precedence: Precedence::StandAside,
        assess: trix_obv,
    },
    StrategyDefinition {
        id: "Vortex ADX",
        category: Category::Momentum,
        requires: &[VORTEX, ADX14],
        precedence: Precedence::StandAside,
        assess: vortex_adx,
    },
];

/// Overbought RSI on a 2x volume surge is momentum worth joining; oversold
/// RSI on the same surge is momentum to the downside.
fn momentum_trading(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let rsi = ctx.value(&RSI14, 0)?;
    let spike = volume_spike(ctx, 2.0)?;
    Ok(Verdict::new(rsi > 70.0 && spike, rsi < 30.0 && spike))
}

fn macd_bullish_adx(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_macd, macd) = pair(ctx, &MACD, Line::Main)?;
    let (prev_signal, signal) = pair(ctx, &MACD, Line::Signal)?;
    let trending = ctx.value(&ADX14, 0)? > 25.0;
    Ok(Verdict::new(
        trending && crossed_above(prev_macd, prev_signal, macd, signal),
        trending && crossed_below(prev_macd, prev_signal, macd, signal),
    ))
}

fn adx_rising_mfi_surge(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_adx, adx) = pair(ctx, &ADX14, Line::Main)?;
    let (prev_mfi, mfi) = pair(ctx, &MFI14, Line::Main)?;
    let plus = ctx.line(&ADX14, Line::Plus, 0)?;
    let minus = ctx.line(&ADX14, Line::Minus, 0)?;
    let rising = adx > prev_adx && adx > 20.0;
    Ok(Verdict::new(
        rising && plus > minus && mfi > 60.0 && mfi - prev_mfi >= 10.0,
        rising && minus > plus && mfi < 40.0 && prev_mfi - mfi >= 10.0,
    ))
}

fn trix_obv(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_trix, trix) = pair(ctx, &TRIX, Line::Main)?;
    let (prev_signal, signal) = pair(ctx, &TRIX, Line::Signal)?;
    let (prev_obv, obv) = pair(ctx, &IndicatorSpec::Obv, Line::Main)?;
    Ok(Verdict::new(
        crossed_above(prev_trix, prev_signal, trix, signal) && obv > prev_obv,
        crossed_below(prev_trix, prev_signal, trix, signal) && obv < prev_obv,
    ))
}

fn vortex_adx(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_plus, plus) = pair(ctx, &VORTEX, Line::Plus)?;
    let (prev_minus, minus) = pair(ctx, &VORTEX, Line::Minus)?;
    let trending = ctx.value(&ADX14, 0)? > 25.0;
    Ok(Verdict::new(
        trending && crossed_above(prev_plus, prev_minus, plus, minus),
        trending && crossed_below(prev_plus, prev_minus, plus, minus),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bar_at, bars_to_series, fires_on_walk};
    use core_types::Timeframe;
    use indicators::IndicatorSet;

    /// Thirty steady half-point moves, then a wider move on five times the
    /// volume.
    fn surge(step: f64) -> core_types::BarSeries {
        let mut bars = Vec::new();
        let mut close = 100.0;
        for i in 0..31 {
            let next = close + if i == 30 { 2.0 * step } else { step };
            let volume = if i == 30 { 5_000 } else { 1_000 };
            bars.push(bar_at(i, close, close.max(next) + 0.1, close.min(next) - 0.1, next, volume));
            close = next;
        }
        bars_to_series(Timeframe::OneMinute, bars)
    }

    #[test]
    fn momentum_trading_follows_the_surge() {
        let up = surge(0.5);
        let set = IndicatorSet::compute(&up, &[RSI14, VOLUME_SMA20]);
        assert_eq!(momentum_trading(&EvalContext::new(&up, &set)).unwrap(), Verdict::new(true, false));

        let down = surge(-0.5);
        let set = IndicatorSet::compute(&down, &[RSI14, VOLUME_SMA20]);
        assert_eq!(momentum_trading(&EvalContext::new(&down, &set)).unwrap(), Verdict::new(false, true));
    }

    #[test]
    fn every_rule_buys_and_sells_on_the_walk() {
        for def in STRATEGIES {
            assert_eq!(fires_on_walk(def.id), (true, true), "{}", def.id);
        }
    }
}
