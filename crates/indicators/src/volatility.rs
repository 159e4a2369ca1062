//! Volatility bands and ranges.
//!
//! ATR(n): TR[0] = high - low, first ATR at n-1 is the mean of TR[0..n), then
//! Wilder smoothing. Bollinger uses the population standard deviation.

use core_types::Bar;

use crate::series::{defined, ema, rolling_max, rolling_min, sma, undefined, wilder, Series};

pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let hl = bar.high - bar.low;
            if i == 0 {
                hl
            } else {
                let prev_close = bars[i - 1].close;
                hl.max((bar.high - prev_close).abs())
                    .max((bar.low - prev_close).abs())
            }
        })
        .collect()
}

pub fn atr(bars: &[Bar], period: usize) -> Series {
    wilder(&defined(&true_range(bars)), period)
}

pub struct Bands {
    pub upper: Series,
    pub middle: Series,
    pub lower: Series,
}

pub fn bollinger(closes: &[f64], period: usize, std_dev: f64) -> Bands {
    let middle = sma(&defined(closes), period);
    let mut upper = undefined(closes.len());
    let mut lower = undefined(closes.len());
    for i in 0..closes.len() {
        let Some(mean) = middle[i] else { continue };
        let window = &closes[i + 1 - period..=i];
        let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
        let width = std_dev * variance.sqrt();
        upper[i] = Some(mean + width);
        lower[i] = Some(mean - width);
    }
    Bands {
        upper,
        middle,
        lower,
    }
}

/// EMA centre line with ATR-scaled bands.
pub fn keltner(bars: &[Bar], ema_period: usize, atr_period: usize, multiplier: f64) -> Bands {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let middle = ema(&defined(&closes), ema_period);
    let range = atr(bars, atr_period);
    let mut upper = undefined(bars.len());
    let mut lower = undefined(bars.len());
    for i in 0..bars.len() {
        if let (Some(m), Some(a)) = (middle[i], range[i]) {
            upper[i] = Some(m + multiplier * a);
            lower[i] = Some(m - multiplier * a);
        }
    }
    Bands {
        upper,
        middle,
        lower,
    }
}

/// Highest high / lowest low channel, including the current bar.
pub fn donchian(bars: &[Bar], period: usize) -> Bands {
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let upper = rolling_max(&highs, period);
    let lower = rolling_min(&lows, period);
    let middle = upper
        .iter()
        .zip(&lower)
        .map(|(h, l)| Some((h.as_ref()? + l.as_ref()?) / 2.0))
        .collect();
    Bands {
        upper,
        middle,
        lower,
    }
}

/// Chandelier exits: (long stop, short stop).
pub fn chandelier(bars: &[Bar], period: usize, multiplier: f64) -> (Series, Series) {
    let channel = donchian(bars, period);
    let range = atr(bars, period);
    let mut long_stop = undefined(bars.len());
    let mut short_stop = undefined(bars.len());
    for i in 0..bars.len() {
        if let (Some(hh), Some(ll), Some(a)) = (channel.upper[i], channel.lower[i], range[i]) {
            long_stop[i] = Some(hh - multiplier * a);
            short_stop[i] = Some(ll + multiplier * a);
        }
    }
    (long_stop, short_stop)
}
