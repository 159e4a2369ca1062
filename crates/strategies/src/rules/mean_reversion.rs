use indicators::{IndicatorSpec, Line};

use super::{
    is_bearish, is_bullish, pair, volume_spike, Result, BOLLINGER, KELTNER, MACD, MFI14, RSI14,
    VOLUME_SMA20,
};
use crate::context::{crossed_above, crossed_below, EvalContext};
use crate::registry::{Category, Precedence, StrategyDefinition, Verdict};

const CCI20: IndicatorSpec = IndicatorSpec::Cci { period: 20 };

pub const STRATEGIES: &[StrategyDefinition] = &[
    StrategyDefinition {
        id: "Mean Reversion (RSI)",
        category: Category::MeanReversion,
        requires: &[RSI14],
        precedence: Precedence::StandAside,
        assess: mean_reversion_rsi,
    },
    StrategyDefinition {
        id: "Scalping (Bollinger Bands)",
        category: Category::MeanReversion,
        requires: &[BOLLINGER],
        precedence: Precedence::StandAside,
        assess: scalping_bollinger,
    },
    StrategyDefinition {
        id: "MACD RSI Oversold",
        category: Category::MeanReversion,
        requires: &[MACD, RSI14],
        precedence: Precedence::StandAside,
        assess: macd_rsi_oversold,
    },
    StrategyDefinition {
        id: "CCI Reversion",
        category: Category::MeanReversion,
        requires: &[CCI20],
        precedence: Precedence::StandAside,
        assess: cci_reversion,
    },
    StrategyDefinition {
        id: "Keltner RSI Oversold",
        category: Category::MeanReversion,
        requires: &[KELTNER, RSI14],
        precedence: Precedence::StandAside,
        assess: keltner_rsi,
    },
    StrategyDefinition {
        id: "Keltner MFI Oversold",
        category: Category::MeanReversion,
        requires: &[KELTNER, MFI14],
        precedence: Precedence::StandAside,
        assess: keltner_mfi,
    },
    StrategyDefinition {
        id: "Bollinger Bounce Volume",
        category: Category::MeanReversion,
        requires: &[BOLLINGER, VOLUME_SMA20],
        precedence: Precedence::StandAside,
        assess: bollinger_bounce_volume,
    },
    StrategyDefinition {
        id: "MFI Bollinger",
        category: Category::MeanReversion,
        requires: &[MFI14, BOLLINGER],
        precedence: Precedence::StandAside,
        assess: mfi_bollinger,
    },
];

fn mean_reversion_rsi(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let rsi = ctx.value(&RSI14, 0)?;
    Ok(Verdict::new(rsi < 30.0, rsi > 70.0))
}

fn scalping_bollinger(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let close = ctx.close(0)?;
    let upper = ctx.line(&BOLLINGER, Line::Upper, 0)?;
    let lower = ctx.line(&BOLLINGER, Line::Lower, 0)?;
    Ok(Verdict::new(close < lower, close > upper))
}

/// MACD turning up while RSI is (or just was) oversold.
fn macd_rsi_oversold(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_macd, macd) = pair(ctx, &MACD, Line::Main)?;
    let (prev_signal, signal) = pair(ctx, &MACD, Line::Signal)?;
    let (prev_rsi, rsi) = pair(ctx, &RSI14, Line::Main)?;
    Ok(Verdict::new(
        crossed_above(prev_macd, prev_signal, macd, signal) && rsi.min(prev_rsi) < 30.0,
        crossed_below(prev_macd, prev_signal, macd, signal) && rsi.max(prev_rsi) > 70.0,
    ))
}

fn cci_reversion(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev, cci) = pair(ctx, &CCI20, Line::Main)?;
    Ok(Verdict::new(
        crossed_above(prev, -100.0, cci, -100.0),
        crossed_below(prev, 100.0, cci, 100.0),
    ))
}

fn keltner_rsi(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let close = ctx.close(0)?;
    let upper = ctx.line(&KELTNER, Line::Upper, 0)?;
    let lower = ctx.line(&KELTNER, Line::Lower, 0)?;
    let rsi = ctx.value(&RSI14, 0)?;
    Ok(Verdict::new(
        close < lower && rsi < 30.0,
        close > upper && rsi > 70.0,
    ))
}

fn keltner_mfi(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let close = ctx.close(0)?;
    let upper = ctx.line(&KELTNER, Line::Upper, 0)?;
    let lower = ctx.line(&KELTNER, Line::Lower, 0)?;
    let mfi = ctx.value(&MFI14, 0)?;
    Ok(Verdict::new(
        close < lower && mfi < 20.0,
        close > upper && mfi > 80.0,
    ))
}

/// The previous bar pierced a band and the latest one closes back inside it
/// in the opposite direction on above-average volume.
fn bollinger_bounce_volume(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let bar = ctx.bar(0)?;
    let prev = ctx.bar(1)?;
    let (prev_lower, lower) = pair(ctx, &BOLLINGER, Line::Lower)?;
    let (prev_upper, upper) = pair(ctx, &BOLLINGER, Line::Upper)?;
    let spike = volume_spike(ctx, 1.5)?;
    Ok(Verdict::new(
        spike && prev.low <= prev_lower && bar.close > lower && is_bullish(bar),
        spike && prev.high >= prev_upper && bar.close < upper && is_bearish(bar),
    ))
}

fn mfi_bollinger(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let close = ctx.close(0)?;
    let upper = ctx.line(&BOLLINGER, Line::Upper, 0)?;
    let lower = ctx.line(&BOLLINGER, Line::Lower, 0)?;
    let mfi = ctx.value(&MFI14, 0)?;
    Ok(Verdict::new(
        close <= lower && mfi < 20.0,
        close >= upper && mfi > 80.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fires_on_walk, series_from_closes};
    use indicators::IndicatorSet;

    #[test]
    fn rsi_extremes() {
        let falling: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let series = series_from_closes(&falling);
        let set = IndicatorSet::compute(&series, &[RSI14]);
        assert_eq!(mean_reversion_rsi(&EvalContext::new(&series, &set)).unwrap(), Verdict::new(true, false));

        let rising: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let series = series_from_closes(&rising);
        let set = IndicatorSet::compute(&series, &[RSI14]);
        assert_eq!(mean_reversion_rsi(&EvalContext::new(&series, &set)).unwrap(), Verdict::new(false, true));
    }

    #[test]
    fn every_rule_buys_and_sells_on_the_walk() {
        for def in STRATEGIES {
            assert_eq!(fires_on_walk(def.id), (true, true), "{}", def.id);
        }
    }
}
