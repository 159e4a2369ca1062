use indicators::{IndicatorSpec, Line};

use super::{pair, Result, BOLLINGER, EMA20, MACD, PSAR, RSI14};
use crate::context::{crossed_above, crossed_below, EvalContext};
use crate::registry::{Category, Precedence, StrategyDefinition, Verdict};

const CCI20: IndicatorSpec = IndicatorSpec::Cci { period: 20 };
const CMO14: IndicatorSpec = IndicatorSpec::Cmo { period: 14 };
const TSI: IndicatorSpec = IndicatorSpec::Tsi {
    long: 25,
    short: 13,
    signal: 7,
};
const AO: IndicatorSpec = IndicatorSpec::AwesomeOscillator { fast: 5, slow: 34 };

pub const STRATEGIES: &[StrategyDefinition] = &[
    StrategyDefinition {
        id: "PSAR RSI",
        category: Category::AdvancedOscillators,
        requires: &[PSAR, RSI14],
        precedence: Precedence::StandAside,
        assess: psar_rsi,
    },
    StrategyDefinition {
        id: "RSI EMA Crossover",
        category: Category::AdvancedOscillators,
        requires: &[RSI14, EMA20],
        precedence: Precedence::StandAside,
        assess: rsi_ema_crossover,
    },
    StrategyDefinition {
        id: "CCI Bollinger",
        category: Category::AdvancedOscillators,
        requires: &[CCI20, BOLLINGER],
        precedence: Precedence::StandAside,
        assess: cci_bollinger,
    },
    StrategyDefinition {
        id: "TSI Resistance Break",
        category: Category::AdvancedOscillators,
        requires: &[TSI],
        precedence: Precedence::StandAside,
        assess: tsi_resistance_break,
    },
    StrategyDefinition {
        id: "Awesome Oscillator Divergence MACD",
        category: Category::AdvancedOscillators,
        requires: &[AO, MACD],
        precedence: Precedence::StandAside,
        assess: awesome_oscillator_macd,
    },
    StrategyDefinition {
        id: "Heikin Ashi CMO",
        category: Category::AdvancedOscillators,
        requires: &[IndicatorSpec::HeikinAshi, CMO14],
        precedence: Precedence::StandAside,
        assess: heikin_ashi_cmo,
    },
];

fn psar_rsi(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_dir, dir) = pair(ctx, &PSAR, Line::Direction)?;
    let rsi = ctx.value(&RSI14, 0)?;
    Ok(Verdict::new(
        prev_dir < 0.0 && dir > 0.0 && rsi > 50.0,
        prev_dir > 0.0 && dir < 0.0 && rsi < 50.0,
    ))
}

fn rsi_ema_crossover(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_rsi, rsi) = pair(ctx, &RSI14, Line::Main)?;
    let close = ctx.close(0)?;
    let ema = ctx.value(&EMA20, 0)?;
    Ok(Verdict::new(
        crossed_above(prev_rsi, 50.0, rsi, 50.0) && close > ema,
        crossed_below(prev_rsi, 50.0, rsi, 50.0) && close < ema,
    ))
}

fn cci_bollinger(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let cci = ctx.value(&CCI20, 0)?;
    let close = ctx.close(0)?;
    let upper = ctx.line(&BOLLINGER, Line::Upper, 0)?;
    let lower = ctx.line(&BOLLINGER, Line::Lower, 0)?;
    Ok(Verdict::new(
        cci < -100.0 && close <= lower,
        cci > 100.0 && close >= upper,
    ))
}

/// TSI above its signal and zero while price clears the prior 20-bar high;
/// mirrored below the prior 20-bar low.
fn tsi_resistance_break(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let tsi = ctx.value(&TSI, 0)?;
    let signal = ctx.line(&TSI, Line::Signal, 0)?;
    let close = ctx.close(0)?;
    let resistance = ctx.highest_high(1, 20)?;
    let support = ctx.lowest_low(1, 20)?;
    Ok(Verdict::new(
        tsi > signal && tsi > 0.0 && close > resistance,
        tsi < signal && tsi < 0.0 && close < support,
    ))
}

fn awesome_oscillator_macd(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let (prev_ao, ao) = pair(ctx, &AO, Line::Main)?;
    let macd = ctx.value(&MACD, 0)?;
    let signal = ctx.line(&MACD, Line::Signal, 0)?;
    Ok(Verdict::new(
        crossed_above(prev_ao, 0.0, ao, 0.0) && macd > signal,
        crossed_below(prev_ao, 0.0, ao, 0.0) && macd < signal,
    ))
}

fn heikin_ashi_cmo(ctx: &EvalContext<'_>) -> Result<Verdict> {
    let ha = IndicatorSpec::HeikinAshi;
    let ha_open = ctx.line(&ha, Line::Open, 0)?;
    let ha_close = ctx.line(&ha, Line::Close, 0)?;
    let (prev_cmo, cmo) = pair(ctx, &CMO14, Line::Main)?;
    Ok(Verdict::new(
        ha_close > ha_open && crossed_above(prev_cmo, 0.0, cmo, 0.0),
        ha_close < ha_open && crossed_below(prev_cmo, 0.0, cmo, 0.0),
    ))
}
