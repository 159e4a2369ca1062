use indicators::{IndicatorSpec, Line};

use super::{
    bearish_rsi_divergence, bullish_rsi_divergence, is_bullish, is_hammer, is_shooting_star,
    pair, volume_spike, Result, KELTNER, RSI14, SUPERTREND, VOLUME_SMA20,
};
use crate::context::EvalContext;
use crate::registry::{Category, Precedence, StrategyDefinition, Verdict};

const ROC10: IndicatorSpec = IndicatorSpec::Roc { period: 10 };

pub const STRATEGIES: &[StrategyDefinition] = &[
    StrategyDefinition {
        id: "Hammer on Keltner Volume",
        category: Category::PatternRecognition,
        requires: &[KELTNER, VOLUME_SMA20],
        precedence: Precedence::StandAside,
        assess: hammer_on_keltner,
    },
    StrategyDefinition {
        id: "Hammer Volume",
        category: Category::PatternRecognition,
        requires: &[VOLUME_SMA20],
        precedence: Precedence::StandAside,
        assess: hammer_volume,
    },
    StrategyDefinition {
        id: "RSI Bullish Divergence Candlestick",
        category: Category::PatternRecognition,
        requires: &[RSI14],
        precedence: Precedence::StandAside,
        assess: rsi_bullish_divergence_candle,
    },
    StrategyDefinition {
        id: "Ross Hook Momentum",
        category: Category::PatternRecognition,
        requires: &[ROC10, RSI14],
        precedence: Precedence::StandAside,
        assess: ross_hook_momentum,
    },
    StrategyDefinition {
        id: "Bearish RSI Divergence",
        category: Category::PatternRecognition,
        requires: &[RSI14],
        precedence: Precedence::StandAside,
        assess: bearish_divergence,
    },
    StrategyDefinition {
        id: "SuperTrend Flip",
        category: Category::PatternRecognition,
        requires: &[SUPERTREND],
        precedence: Precedence::StandAside,
        assess: supertrend_flip,
    },
];

/// Hammer at the lower Keltner band (shooting star at the upper) on 1.5x
/// volume.
fn hammer_on_keltner(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let bar = ctx.bar(0)?;
    let upper = ctx.line(&KELTNER, Line::Upper, 0)?;
    let lower = ctx.line(&KELTNER, Line::Lower, 0)?;
    let spike = volume_spike(ctx, 1.5)?;
    Ok(Verdict::new(
        spike && is_hammer(bar) && bar.low <= lower,
        spike && is_shooting_star(bar) && bar.high >= upper,
    ))
}

/// Hammer after three lower closes, or a shooting star after three higher
/// ones, confirmed by 1.5x volume.
fn hammer_volume(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let bar = ctx.bar(0)?;
    let closes = [ctx.close(3)?, ctx.close(2)?, ctx.close(1)?];
    let declining = closes.windows(2).all(|w| w[1] < w[0]);
    let advancing = closes.windows(2).all(|w| w[1] > w[0]);
    let spike = volume_spike(ctx, 1.5)?;
    Ok(Verdict::new(
        spike && declining && is_hammer(bar),
        spike && advancing && is_shooting_star(bar),
    ))
}

fn rsi_bullish_divergence_candle(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let bar = ctx.bar(0)?;
    let candle = is_hammer(bar) || is_bullish(bar);
    Ok(Verdict::buy_only(
        candle && bullish_rsi_divergence(ctx, &RSI14, 14)?,
    ))
}

/// Price takes out the high of the previous three bars (the hook) with
/// positive rate of change and RSI above 50, mirrored for sells.
fn ross_hook_momentum(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let close = ctx.close(0)?;
    let hook_high = ctx.highest_high(1, 3)?;
    let hook_low = ctx.lowest_low(1, 3)?;
    let roc = ctx.value(&ROC10, 0)?;
    let rsi = ctx.value(&RSI14, 0)?;
    Ok(Verdict::new(
        close > hook_high && roc > 0.0 && rsi > 50.0,
        close < hook_low && roc < 0.0 && rsi < 50.0,
    ))
}

fn bearish_divergence(ctx: &EvalContext<'_>) -> Result<Verdict> {
    Ok(Verdict::sell_only(bearish_rsi_divergence(ctx, &RSI14, 14)?))
}

fn supertrend_flip(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_dir, dir) = pair(ctx, &SUPERTREND, Line::Direction)?;
    Ok(Verdict::new(
        prev_dir < 0.0 && dir > 0.0,
        prev_dir > 0.0 && dir < 0.0,
    ))
}
