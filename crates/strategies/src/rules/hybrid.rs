use indicators::{IndicatorSpec, Line};

use super::{
    is_bearish, is_bullish, pair, ribbon_alignment, volume_spike, Result, BOLLINGER, EMA20,
    EMA21, EMA50, EMA9, KELTNER, MACD, RIBBON, RSI14, VOLUME_SMA20,
};
use crate::context::{crossed_above, crossed_below, EvalContext};
use crate::registry::{Category, Precedence, StrategyDefinition, Verdict};

const CHANDELIER: IndicatorSpec = IndicatorSpec::Chandelier {
    period: 22,
    multiplier: 3.0,
};
const CMF20: IndicatorSpec = IndicatorSpec::Cmf { period: 20 };

/// Widest spread of the five prior closes, relative to the latest close,
/// that still counts as consolidation.
const PRICE_STABILITY: f64 = 0.002;

pub const STRATEGIES: &[StrategyDefinition] = &[
    StrategyDefinition {
        id: "Reversal (RSI/MACD)",
        category: Category::Hybrid,
        requires: &[RSI14, MACD],
        precedence: Precedence::StandAside,
        assess: reversal_rsi_macd,
    },
    StrategyDefinition {
        id: "Pullback Trading (EMA)",
        category: Category::Hybrid,
        requires: &[EMA9, EMA21],
        precedence: Precedence::StandAside,
        assess: pullback_trading,
    },
    StrategyDefinition {
        id: "End-of-Day (Intraday Consolidation)",
        category: Category::Hybrid,
        requires: &[EMA20, VOLUME_SMA20],
        precedence: Precedence::StandAside,
        assess: end_of_day_consolidation,
    },
    StrategyDefinition {
        id: "EMA Ribbon MACD",
        category: Category::Hybrid,
        requires: &[
            RIBBON[0], RIBBON[1], RIBBON[2], RIBBON[3], RIBBON[4], MACD,
        ],
        precedence: Precedence::StandAside,
        assess: ema_ribbon_macd,
    },
    StrategyDefinition {
        id: "Chandelier Exit MACD",
        category: Category::Hybrid,
        requires: &[CHANDELIER, MACD],
        precedence: Precedence::StandAside,
        assess: chandelier_exit_macd,
    },
    StrategyDefinition {
        id: "Double MA Pullback",
        category: Category::Hybrid,
        requires: &[EMA20, EMA50],
        precedence: Precedence::StandAside,
        assess: double_ma_pullback,
    },
    StrategyDefinition {
        id: "RSI Range Breakout BB",
        category: Category::Hybrid,
        requires: &[RSI14, BOLLINGER],
        precedence: Precedence::StandAside,
        assess: rsi_range_breakout_bb,
    },
    StrategyDefinition {
        id: "Keltner Middle RSI Divergence",
        category: Category::Hybrid,
        requires: &[KELTNER, RSI14],
        precedence: Precedence::StandAside,
        assess: keltner_middle_rsi,
    },
    StrategyDefinition {
        id: "EMA Ribbon Expansion CMF",
        category: Category::Hybrid,
        requires: &[
            RIBBON[0], RIBBON[1], RIBBON[2], RIBBON[3], RIBBON[4], CMF20,
        ],
        precedence: Precedence::StandAside,
        assess: ema_ribbon_expansion_cmf,
    },
    StrategyDefinition {
        id: "MACD Bearish Cross",
        category: Category::Hybrid,
        requires: &[MACD, VOLUME_SMA20],
        precedence: Precedence::StandAside,
        assess: macd_bearish_cross,
    },
];

/// RSI leaving oversold (overbought) while the MACD histogram turns up (down).
fn reversal_rsi_macd(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_rsi, rsi) = pair(ctx, &RSI14, Line::Main)?;
    let (prev_hist, hist) = pair(ctx, &MACD, Line::Histogram)?;
    Ok(Verdict::new(
        crossed_above(prev_rsi, 30.0, rsi, 30.0) && hist > prev_hist,
        crossed_below(prev_rsi, 70.0, rsi, 70.0) && hist < prev_hist,
    ))
}

/// In an EMA(9) > EMA(21) uptrend, the bar dips to EMA(9) and closes back
/// above it.
fn pullback_trading(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let bar = ctx.bar(0)?;
    let fast = ctx.value(&EMA9, 0)?;
    let slow = ctx.value(&EMA21, 0)?;
    Ok(Verdict::new(
        fast > slow && bar.low <= fast && bar.close > fast,
        fast < slow && bar.high >= fast && bar.close < fast,
    ))
}

fn end_of_day_consolidation(ctx: &EvalContext<'_>) -> Result<Verdict> {
    if !ctx.timeframe().is_intraday() {
        return Ok(Verdict::none());
    }
    let close = ctx.close(0)?;
    let prior = ctx.window(1, 5)?;
    let top = prior.iter().map(|b| b.close).fold(f64::MIN, f64::max);
    let bottom = prior.iter().map(|b| b.close).fold(f64::MAX, f64::min);
    if (top - bottom) / close > PRICE_STABILITY {
        return Ok(Verdict::none());
    }
    let ema = ctx.value(&EMA20, 0)?;
    let spike = volume_spike(ctx, 1.5)?;
    Ok(Verdict::new(
        spike && close > top && close > ema,
        spike && close < bottom && close < ema,
    ))
}

fn ema_ribbon_macd(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let alignment = ribbon_alignment(ctx, 0)?;
    let (prev_macd, macd) = pair(ctx, &MACD, Line::Main)?;
    let (prev_signal, signal) = pair(ctx, &MACD, Line::Signal)?;
    Ok(Verdict::new(
        alignment == Some(true) && crossed_above(prev_macd, prev_signal, macd, signal),
        alignment == Some(false) && crossed_below(prev_macd, prev_signal, macd, signal),
    ))
}

/// Close reclaiming the short-side chandelier stop with MACD above its
/// signal, or losing the long-side stop with MACD below it.
fn chandelier_exit_macd(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_close, close) = (ctx.close(1)?, ctx.close(0)?);
    let (prev_short, short_stop) = pair(ctx, &CHANDELIER, Line::ShortStop)?;
    let (prev_long, long_stop) = pair(ctx, &CHANDELIER, Line::LongStop)?;
    let macd = ctx.value(&MACD, 0)?;
    let signal = ctx.line(&MACD, Line::Signal, 0)?;
    Ok(Verdict::new(
        crossed_above(prev_close, prev_short, close, short_stop) && macd > signal,
        crossed_below(prev_close, prev_long, close, long_stop) && macd < signal,
    ))
}

fn double_ma_pullback(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let bar = ctx.bar(0)?;
    let fast = ctx.value(&EMA20, 0)?;
    let slow = ctx.value(&EMA50, 0)?;
    Ok(Verdict::new(
        fast > slow && bar.low <= fast && bar.close > fast && is_bullish(bar),
        fast < slow && bar.high >= fast && bar.close < fast && is_bearish(bar),
    ))
}

/// RSI held between 40 and 60 for the five prior bars, then price breaks
/// out of the Bollinger bands.
fn rsi_range_breakout_bb(ctx: &EvalContext<'_>) -> Result<Verdict> {
    for back in 1..=5 {
        let rsi = ctx.value(&RSI14, back)?;
        if !(40.0..=60.0).contains(&rsi) {
            return Ok(Verdict::none());
        }
    }
    let close = ctx.close(0)?;
    let upper = ctx.line(&BOLLINGER, Line::Upper, 0)?;
    let lower = ctx.line(&BOLLINGER, Line::Lower, 0)?;
    Ok(Verdict::new(close > upper, close < lower))
}

fn keltner_middle_rsi(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_close, close) = (ctx.close(1)?, ctx.close(0)?);
    let (prev_mid, mid) = pair(ctx, &KELTNER, Line::Middle)?;
    let rsi = ctx.value(&RSI14, 0)?;
    let earlier_rsi = ctx.value(&RSI14, 3)?;
    Ok(Verdict::new(
        crossed_above(prev_close, prev_mid, close, mid) && rsi > earlier_rsi,
        crossed_below(prev_close, prev_mid, close, mid) && rsi < earlier_rsi,
    ))
}

/// Aligned ribbon whose outer spread is widening, with money flowing the
/// same way.
fn ema_ribbon_expansion_cmf(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let alignment = ribbon_alignment(ctx, 0)?;
    let spread = |back| -> Result<f64> {
        Ok((ctx.value(&RIBBON[0], back)? - ctx.value(&RIBBON[4], back)?).abs())
    };
    let expanding = spread(0)? > spread(1)?;
    let cmf = ctx.value(&CMF20, 0)?;
    Ok(Verdict::new(
        expanding && alignment == Some(true) && cmf > 0.05,
        expanding && alignment == Some(false) && cmf < -0.05,
    ))
}

fn macd_bearish_cross(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_macd, macd) = pair(ctx, &MACD, Line::Main)?;
    let (prev_signal, signal) = pair(ctx, &MACD, Line::Signal)?;
    Ok(Verdict::sell_only(
        crossed_below(prev_macd, prev_signal, macd, signal) && volume_spike(ctx, 1.2)?,
    ))
}
