use indicators::{IndicatorSpec, Line};

use super::{pair, Result, ADX14, EMA200, EMA21, EMA50, EMA9, PSAR, RSI14, SUPERTREND};
use crate::context::{crossed_above, crossed_below, EvalContext};
use crate::registry::{Category, Precedence, StrategyDefinition, Verdict};

const ICHIMOKU: IndicatorSpec = IndicatorSpec::Ichimoku {
    tenkan: 9,
    kijun: 26,
    senkou_b: 52,
};

pub const STRATEGIES: &[StrategyDefinition] = &[
    StrategyDefinition {
        id: "Trend Following (EMA/ADX)",
        category: Category::TrendFollowing,
        requires: &[EMA9, EMA21, ADX14],
        precedence: Precedence::StandAside,
        assess: trend_following,
    },
    StrategyDefinition {
        id: "Golden Cross",
        category: Category::TrendFollowing,
        requires: &[EMA50, EMA200],
        precedence: Precedence::StandAside,
        assess: golden_cross,
    },
    StrategyDefinition {
        id: "Golden Cross RSI",
        category: Category::TrendFollowing,
        requires: &[EMA50, EMA200, RSI14],
        precedence: Precedence::StandAside,
        assess: golden_cross_rsi,
    },
    StrategyDefinition {
        id: "SuperTrend RSI Pullback",
        category: Category::TrendFollowing,
        requires: &[SUPERTREND, RSI14],
        precedence: Precedence::StandAside,
        assess: supertrend_rsi_pullback,
    },
    StrategyDefinition {
        id: "ADX Heikin Ashi",
        category: Category::TrendFollowing,
        requires: &[ADX14, IndicatorSpec::HeikinAshi],
        precedence: Precedence::StandAside,
        assess: adx_heikin_ashi,
    },
    StrategyDefinition {
        id: "Ichimoku Basic Combo",
        category: Category::TrendFollowing,
        requires: &[ICHIMOKU],
        precedence: Precedence::StandAside,
        assess: ichimoku_basic,
    },
    StrategyDefinition {
        id: "Ichimoku Multi-Line",
        category: Category::TrendFollowing,
        requires: &[ICHIMOKU],
        precedence: Precedence::StandAside,
        assess: ichimoku_multi_line,
    },
    StrategyDefinition {
        id: "EMA SAR",
        category: Category::TrendFollowing,
        requires: &[EMA50, PSAR],
        precedence: Precedence::StandAside,
        assess: ema_sar,
    },
];

fn trend_following(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let fast = ctx.value(&EMA9, 0)?;
    let slow = ctx.value(&EMA21, 0)?;
    let adx = ctx.value(&ADX14, 0)?;
    let plus = ctx.line(&ADX14, Line::Plus, 0)?;
    let minus = ctx.line(&ADX14, Line::Minus, 0)?;
    let strong = adx > 25.0;
    Ok(Verdict::new(
        strong && fast > slow && plus > minus,
        strong && fast < slow && minus > plus,
    ))
}

/// EMA(50) crossing EMA(200), reported on the crossing bar only.
fn golden_cross(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_fast, fast) = pair(ctx, &EMA50, Line::Main)?;
    let (prev_slow, slow) = pair(ctx, &EMA200, Line::Main)?;
    Ok(Verdict::new(
        crossed_above(prev_fast, prev_slow, fast, slow),
        crossed_below(prev_fast, prev_slow, fast, slow),
    ))
}

fn golden_cross_rsi(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let fast = ctx.value(&EMA50, 0)?;
    let slow = ctx.value(&EMA200, 0)?;
    let (prev_rsi, rsi) = pair(ctx, &RSI14, Line::Main)?;
    Ok(Verdict::new(
        fast > slow && crossed_above(prev_rsi, 50.0, rsi, 50.0),
        fast < slow && crossed_below(prev_rsi, 50.0, rsi, 50.0),
    ))
}

/// In an established SuperTrend, buy the RSI recovering from a pullback.
fn supertrend_rsi_pullback(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let direction = ctx.line(&SUPERTREND, Line::Direction, 0)?;
    let (prev_rsi, rsi) = pair(ctx, &RSI14, Line::Main)?;
    Ok(Verdict::new(
        direction > 0.0 && crossed_above(prev_rsi, 40.0, rsi, 40.0),
        direction < 0.0 && crossed_below(prev_rsi, 60.0, rsi, 60.0),
    ))
}

fn adx_heikin_ashi(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let ha = IndicatorSpec::HeikinAshi;
    let (prev_open, open) = pair(ctx, &ha, Line::Open)?;
    let (prev_close, close) = pair(ctx, &ha, Line::Close)?;
    let strong = ctx.value(&ADX14, 0)? > 25.0;
    Ok(Verdict::new(
        strong && close > open && prev_close <= prev_open,
        strong && close < open && prev_close >= prev_open,
    ))
}

fn cloud(ctx: &EvalContext<'_>, back: usize) -> Result<(f64, f64)> {
    let a = ctx.line(&ICHIMOKU, Line::SenkouA, back)?;
    let b = ctx.line(&ICHIMOKU, Line::SenkouB, back)?;
    Ok((a.max(b), a.min(b)))
}

fn ichimoku_basic(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_tenkan, tenkan) = pair(ctx, &ICHIMOKU, Line::Tenkan)?;
    let (prev_kijun, kijun) = pair(ctx, &ICHIMOKU, Line::Kijun)?;
    let (top, bottom) = cloud(ctx, 0)?;
    let close = ctx.close(0)?;
    Ok(Verdict::new(
        crossed_above(prev_tenkan, prev_kijun, tenkan, kijun) && close > top,
        crossed_below(prev_tenkan, prev_kijun, tenkan, kijun) && close < bottom,
    ))
}

/// Every Ichimoku line agrees, including the lagging span: the close is
/// compared with the close 26 bars ago.
fn ichimoku_multi_line(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let tenkan = ctx.line(&ICHIMOKU, Line::Tenkan, 0)?;
    let kijun = ctx.line(&ICHIMOKU, Line::Kijun, 0)?;
    let span_a = ctx.line(&ICHIMOKU, Line::SenkouA, 0)?;
    let span_b = ctx.line(&ICHIMOKU, Line::SenkouB, 0)?;
    let (top, bottom) = cloud(ctx, 0)?;
    let (prev_top, prev_bottom) = cloud(ctx, 1)?;
    let close = ctx.close(0)?;
    let prev_close = ctx.close(1)?;
    let lagging = ctx.close(26)?;

    let bullish = close > top && tenkan > kijun && span_a > span_b && close > lagging;
    let bearish = close < bottom && tenkan < kijun && span_a < span_b && close < lagging;
    // Only the bar on which the full alignment first appears.
    let was_bullish = prev_close > prev_top;
    let was_bearish = prev_close < prev_bottom;
    Ok(Verdict::new(bullish && !was_bullish, bearish && !was_bearish))
}

fn ema_sar(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_dir, dir) = pair(ctx, &PSAR, Line::Direction)?;
    let close = ctx.close(0)?;
    let ema = ctx.value(&EMA50, 0)?;
    Ok(Verdict::new(
        dir > 0.0 && prev_dir < 0.0 && close > ema,
        dir < 0.0 && prev_dir > 0.0 && close < ema,
    ))
}
