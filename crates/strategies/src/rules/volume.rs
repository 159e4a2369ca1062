use indicators::{IndicatorSpec, Line};

use super::{pair, volume_spike, Result, BOLLINGER, RSI14, VOLUME_SMA20};
use crate::context::{crossed_above, crossed_below, EvalContext};
use crate::registry::{Category, Precedence, StrategyDefinition, Verdict};

const TEMA9: IndicatorSpec = IndicatorSpec::Tema { period: 9 };
const TEMA21: IndicatorSpec = IndicatorSpec::Tema { period: 21 };
const AROON14: IndicatorSpec = IndicatorSpec::Aroon { period: 14 };

pub const STRATEGIES: &[StrategyDefinition] = &[
    StrategyDefinition {
        id: "VWAP RSI",
        category: Category::VolumeAndVolatility,
        requires: &[IndicatorSpec::Vwap, RSI14],
        precedence: Precedence::StandAside,
        assess: vwap_rsi,
    },
    StrategyDefinition {
        id: "News Trading (Volatility Spike)",
        category: Category::VolumeAndVolatility,
        requires: &[VOLUME_SMA20],
        precedence: Precedence::StandAside,
        assess: news_trading,
    },
    StrategyDefinition {
        id: "TEMA Cross Volume",
        category: Category::VolumeAndVolatility,
        requires: &[TEMA9, TEMA21, VOLUME_SMA20],
        precedence: Precedence::StandAside,
        assess: tema_cross_volume,
    },
    StrategyDefinition {
        id: "VWAP Aroon",
        category: Category::VolumeAndVolatility,
        requires: &[IndicatorSpec::Vwap, AROON14],
        precedence: Precedence::StandAside,
        assess: vwap_aroon,
    },
    StrategyDefinition {
        id: "VWAP Breakdown Volume",
        category: Category::VolumeAndVolatility,
        requires: &[IndicatorSpec::Vwap, RSI14, VOLUME_SMA20],
        precedence: Precedence::StandAside,
        assess: vwap_breakdown_volume,
    },
    StrategyDefinition {
        id: "Bollinger Upper Break Volume",
        category: Category::VolumeAndVolatility,
        requires: &[BOLLINGER, VOLUME_SMA20],
        precedence: Precedence::StandAside,
        assess: bollinger_upper_break_volume,
    },
];

fn vwap_cross(ctx: &EvalContext<'_>) -> Result<(bool, bool)> {
    let (prev_close, close) = (ctx.close(1)?, ctx.close(0)?);
    let (prev_vwap, vwap) = pair(ctx, &IndicatorSpec::Vwap, Line::Main)?;
    Ok((
        crossed_above(prev_close, prev_vwap, close, vwap),
        crossed_below(prev_close, prev_vwap, close, vwap),
    ))
}

fn vwap_rsi(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (above, below) = vwap_cross(ctx)?;
    let rsi = ctx.value(&RSI14, 0)?;
    Ok(Verdict::new(
        above && rsi > 50.0 && rsi < 70.0,
        below && rsi < 50.0 && rsi > 30.0,
    ))
}

/// A bar that moves more than 2% on 2.5x average volume; direction follows
/// the move.
fn news_trading(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let prev_close = ctx.close(1)?;
    let change = (ctx.close(0)? - prev_close) / prev_close;
    let spike = volume_spike(ctx, 2.5)?;
    Ok(Verdict::new(
        spike && change > 0.02,
        spike && change < -0.02,
    ))
}

fn tema_cross_volume(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_fast, fast) = pair(ctx, &TEMA9, Line::Main)?;
    let (prev_slow, slow) = pair(ctx, &TEMA21, Line::Main)?;
    let spike = volume_spike(ctx, 1.2)?;
    Ok(Verdict::new(
        spike && crossed_above(prev_fast, prev_slow, fast, slow),
        spike && crossed_below(prev_fast, prev_slow, fast, slow),
    ))
}

fn vwap_aroon(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let close = ctx.close(0)?;
    let vwap = ctx.value(&IndicatorSpec::Vwap, 0)?;
    let (prev_up, up) = pair(ctx, &AROON14, Line::Up)?;
    let (prev_down, down) = pair(ctx, &AROON14, Line::Down)?;
    Ok(Verdict::new(
        close > vwap && crossed_above(prev_up, 70.0, up, 70.0) && down < 30.0,
        close < vwap && crossed_above(prev_down, 70.0, down, 70.0) && up < 30.0,
    ))
}

fn vwap_breakdown_volume(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (_, below) = vwap_cross(ctx)?;
    let rsi = ctx.value(&RSI14, 0)?;
    Ok(Verdict::sell_only(
        below && rsi < 50.0 && volume_spike(ctx, 1.5)?,
    ))
}

/// Close breaking out through the upper band on 1.5x volume, or through the
/// lower band for sells.
fn bollinger_upper_break_volume(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_close, close) = (ctx.close(1)?, ctx.close(0)?);
    let (prev_upper, upper) = pair(ctx, &BOLLINGER, Line::Upper)?;
    let (prev_lower, lower) = pair(ctx, &BOLLINGER, Line::Lower)?;
    let spike = volume_spike(ctx, 1.5)?;
    Ok(Verdict::new(
        spike && crossed_above(prev_close, prev_upper, close, upper),
        spike && crossed_below(prev_close, prev_lower, close, lower),
    ))
}
