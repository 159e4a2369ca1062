use indicators::{IndicatorSpec, Line};

use super::{is_bearish, is_bullish, pair, volume_spike, Result, EMA20, RSI14, VOLUME_SMA20};
use crate::context::{crossed_above, crossed_below, EvalContext};
use crate::registry::{Category, Precedence, StrategyDefinition, Verdict};

const PIVOT20: IndicatorSpec = IndicatorSpec::Pivot { lookback: 20 };

/// Length of the opening range in minutes.
const OPENING_RANGE_MINUTES: u32 = 15;

pub const STRATEGIES: &[StrategyDefinition] = &[
    StrategyDefinition {
        id: "Breakout Trading",
        category: Category::BreakoutAndPatterns,
        requires: &[EMA20, VOLUME_SMA20],
        precedence: Precedence::StandAside,
        assess: breakout_trading,
    },
    StrategyDefinition {
        id: "Opening Range Breakout",
        category: Category::BreakoutAndPatterns,
        requires: &[VOLUME_SMA20],
        precedence: Precedence::StandAside,
        assess: opening_range_breakout,
    },
    StrategyDefinition {
        id: "Gap and Go",
        category: Category::BreakoutAndPatterns,
        requires: &[RSI14, VOLUME_SMA20],
        precedence: Precedence::StandAside,
        assess: gap_and_go,
    },
    StrategyDefinition {
        id: "Fractal Breakout RSI",
        category: Category::BreakoutAndPatterns,
        requires: &[IndicatorSpec::Fractal, RSI14],
        precedence: Precedence::StandAside,
        assess: fractal_breakout_rsi,
    },
    StrategyDefinition {
        id: "Pivot Point (Intraday S/R)",
        category: Category::BreakoutAndPatterns,
        requires: &[PIVOT20, EMA20],
        precedence: Precedence::StandAside,
        assess: pivot_point,
    },
    StrategyDefinition {
        id: "Liquidity Sweep Reversal",
        category: Category::BreakoutAndPatterns,
        requires: &[RSI14],
        precedence: Precedence::StandAside,
        assess: liquidity_sweep_reversal,
    },
];

fn breakout_trading(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_close, close) = (ctx.close(1)?, ctx.close(0)?);
    let (prev_ema, ema) = pair(ctx, &EMA20, Line::Main)?;
    let spike = volume_spike(ctx, 1.5)?;
    Ok(Verdict::new(
        spike && crossed_above(prev_close, prev_ema, close, ema),
        spike && crossed_below(prev_close, prev_ema, close, ema),
    ))
}

/// Close beyond the high or low of the session's first fifteen minutes.
/// Sessions are UTC calendar days; daily bars never qualify.
fn opening_range_breakout(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let timeframe = ctx.timeframe();
    if !timeframe.is_intraday() {
        return Ok(Verdict::none());
    }
    let bars = ctx.bars();
    let latest = ctx.bar(0)?;
    let day = latest.timestamp.date_naive();
    let session_start = bars
        .iter()
        .rposition(|b| b.timestamp.date_naive() != day)
        .map_or(0, |i| i + 1);
    let session = &bars[session_start..];

    let range_bars = OPENING_RANGE_MINUTES.div_ceil(timeframe.minutes().max(1)) as usize;
    // The latest bar has to come after the opening range.
    if session.len() <= range_bars {
        return Ok(Verdict::none());
    }
    let opening = &session[..range_bars];
    let or_high = opening.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let or_low = opening.iter().map(|b| b.low).fold(f64::MAX, f64::min);

    let spike = volume_spike(ctx, 1.5)?;
    Ok(Verdict::new(
        spike && latest.close > or_high,
        spike && latest.close < or_low,
    ))
}

fn gap_and_go(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let bar = ctx.bar(0)?;
    let prev_close = ctx.close(1)?;
    let gap = (bar.open - prev_close) / prev_close;
    let rsi = ctx.value(&RSI14, 0)?;
    let spike = volume_spike(ctx, 1.5)?;
    Ok(Verdict::new(
        spike && gap >= 0.02 && is_bullish(bar) && rsi > 50.0,
        spike && gap <= -0.02 && is_bearish(bar) && rsi < 50.0,
    ))
}

fn fractal_breakout_rsi(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_up, up) = pair(ctx, &IndicatorSpec::Fractal, Line::Up)?;
    let (prev_down, down) = pair(ctx, &IndicatorSpec::Fractal, Line::Down)?;
    let (prev_close, close) = (ctx.close(1)?, ctx.close(0)?);
    let rsi = ctx.value(&RSI14, 0)?;
    Ok(Verdict::new(
        crossed_above(prev_close, prev_up, close, up) && rsi > 50.0,
        crossed_below(prev_close, prev_down, close, down) && rsi < 50.0,
    ))
}

/// Bounce off S1 or a break through R1 while price holds the trend side of
/// EMA(20), mirrored for sells.
fn pivot_point(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let bar = ctx.bar(0)?;
    let prev_close = ctx.close(1)?;
    let s1 = ctx.line(&PIVOT20, Line::S1, 0)?;
    let r1 = ctx.line(&PIVOT20, Line::R1, 0)?;
    let ema = ctx.value(&EMA20, 0)?;

    let support_bounce = bar.low <= s1 && bar.close > s1 && is_bullish(bar);
    let resistance_break = prev_close <= r1 && bar.close > r1;
    let resistance_reject = bar.high >= r1 && bar.close < r1 && is_bearish(bar);
    let support_break = prev_close >= s1 && bar.close < s1;
    Ok(Verdict::new(
        bar.close > ema && (support_bounce || resistance_break),
        bar.close < ema && (resistance_reject || support_break),
    ))
}

/// Price runs the prior 20-bar extreme, then closes back inside it.
fn liquidity_sweep_reversal(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let bar = ctx.bar(0)?;
    let prior_low = ctx.lowest_low(1, 20)?;
    let prior_high = ctx.highest_high(1, 20)?;
    let rsi = ctx.value(&RSI14, 0)?;
    Ok(Verdict::new(
        bar.low < prior_low && bar.close > prior_low && rsi < 40.0,
        bar.high > prior_high && bar.close < prior_high && rsi > 60.0,
    ))
}
