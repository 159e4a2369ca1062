//! Momentum oscillators.
//!
//! Warm-up (index of the first defined value):
//! - RSI(n), CMO(n), ROC(n): n
//! - MACD(f, s, sig): line at s-1, signal/histogram at s+sig-2
//! - Stochastic(k, d): %K at k-1, %D at k+d-2
//! - CCI(n): n-1
//! - TSI(l, s, sig): line at l+s-1, signal at l+s+sig-2
//! - TRIX(n, sig): line at 3n-2, signal at 3n+sig-3
//! - TEMA(n): 3n-3
//! - Awesome Oscillator(fast, slow): slow-1

use core_types::Bar;

use crate::series::{defined, ema, rolling_max, rolling_min, sma, undefined, zip_with, Series};

/// Wilder RSI. Flat data reads 50; no losses reads 100; no gains reads 0.
pub fn rsi(closes: &[f64], period: usize) -> Series {
    let n = closes.len();
    let mut out = undefined(n);
    if period == 0 || n < period + 1 {
        return out;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    let alpha = 1.0 / period as f64;
    for i in (period + 1)..n {
        let change = closes[i] - closes[i - 1];
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
        out[i] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain == 0.0 && avg_loss == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

pub struct Macd {
    pub line: Series,
    pub signal: Series,
    pub histogram: Series,
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let src = defined(closes);
    let line = zip_with(&ema(&src, fast), &ema(&src, slow), |f, s| f - s);
    let signal_line = ema(&line, signal);
    let histogram = zip_with(&line, &signal_line, |l, s| l - s);
    Macd {
        line,
        signal: signal_line,
        histogram,
    }
}

/// Fast stochastic: raw %K and its SMA as %D. A zero high-low range reads 50.
pub fn stochastic(bars: &[Bar], k_period: usize, d_period: usize) -> (Series, Series) {
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let hh = rolling_max(&highs, k_period);
    let ll = rolling_min(&lows, k_period);

    let k: Series = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| match (hh[i], ll[i]) {
            (Some(h), Some(l)) if h > l => Some(100.0 * (bar.close - l) / (h - l)),
            (Some(_), Some(_)) => Some(50.0),
            _ => None,
        })
        .collect();
    let d = sma(&k, d_period);
    (k, d)
}

/// Commodity Channel Index on typical price. Zero mean deviation reads 0.
pub fn cci(bars: &[Bar], period: usize) -> Series {
    let tp: Vec<f64> = bars.iter().map(Bar::typical_price).collect();
    let mean = sma(&defined(&tp), period);
    let mut out = undefined(bars.len());
    for i in 0..bars.len() {
        let Some(m) = mean[i] else { continue };
        let window = &tp[i + 1 - period..=i];
        let deviation = window.iter().map(|v| (v - m).abs()).sum::<f64>() / period as f64;
        out[i] = Some(if deviation == 0.0 {
            0.0
        } else {
            (tp[i] - m) / (0.015 * deviation)
        });
    }
    out
}

/// Chande Momentum Oscillator over `period` changes. Flat data reads 0.
pub fn cmo(closes: &[f64], period: usize) -> Series {
    let n = closes.len();
    let mut out = undefined(n);
    if period == 0 {
        return out;
    }
    for i in period..n {
        let (mut up, mut down) = (0.0, 0.0);
        for j in (i + 1 - period)..=i {
            let change = closes[j] - closes[j - 1];
            if change > 0.0 {
                up += change;
            } else {
                down -= change;
            }
        }
        out[i] = Some(if up + down == 0.0 {
            0.0
        } else {
            100.0 * (up - down) / (up + down)
        });
    }
    out
}

/// Rate of change in percent.
pub fn roc(closes: &[f64], period: usize) -> Series {
    let mut out = undefined(closes.len());
    for i in period..closes.len() {
        out[i] = Some(100.0 * (closes[i] - closes[i - period]) / closes[i - period]);
    }
    out
}

/// True Strength Index and its signal line.
pub fn tsi(closes: &[f64], long: usize, short: usize, signal: usize) -> (Series, Series) {
    let mut momentum = undefined(closes.len());
    let mut abs_momentum = undefined(closes.len());
    for i in 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        momentum[i] = Some(change);
        abs_momentum[i] = Some(change.abs());
    }
    let num = ema(&ema(&momentum, long), short);
    let den = ema(&ema(&abs_momentum, long), short);
    let line = zip_with(&num, &den, |n, d| if d == 0.0 { 0.0 } else { 100.0 * n / d });
    let signal_line = ema(&line, signal);
    (line, signal_line)
}

fn triple_ema(closes: &[f64], period: usize) -> (Series, Series, Series) {
    let e1 = ema(&defined(closes), period);
    let e2 = ema(&e1, period);
    let e3 = ema(&e2, period);
    (e1, e2, e3)
}

pub fn tema(closes: &[f64], period: usize) -> Series {
    let (e1, e2, e3) = triple_ema(closes, period);
    e1.iter()
        .zip(&e2)
        .zip(&e3)
        .map(|((a, b), c)| match (a, b, c) {
            (Some(a), Some(b), Some(c)) => Some(3.0 * a - 3.0 * b + c),
            _ => None,
        })
        .collect()
}

/// TRIX: one-bar percent change of the triple-smoothed EMA.
pub fn trix(closes: &[f64], period: usize, signal: usize) -> (Series, Series) {
    let (_, _, e3) = triple_ema(closes, period);
    let mut line = undefined(closes.len());
    for i in 1..closes.len() {
        if let (Some(prev), Some(cur)) = (e3[i - 1], e3[i]) {
            line[i] = Some(100.0 * (cur - prev) / prev);
        }
    }
    let signal_line = ema(&line, signal);
    (line, signal_line)
}

pub fn awesome_oscillator(bars: &[Bar], fast: usize, slow: usize) -> Series {
    let median: Series = bars.iter().map(|b| Some(b.median_price())).collect();
    zip_with(&sma(&median, fast), &sma(&median, slow), |f, s| f - s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert_approx, make_series};

    #[test]
    fn rsi_all_gains_is_100() {
        let out = rsi(&[100.0, 101.0, 102.0, 103.0, 104.0], 3);
        assert_eq!(&out[..3], &[None, None, None]);
        assert_approx(out[3].unwrap(), 100.0);
        assert_approx(out[4].unwrap(), 100.0);
    }

    #[test]
    fn rsi_flat_is_50() {
        let out = rsi(&[10.0; 20], 14);
        assert_approx(out[14].unwrap(), 50.0);
        assert_approx(out[19].unwrap(), 50.0);
    }

    #[test]
    fn rsi_mixed_seed() {
        // changes: +2, -1, +1 -> avg gain 1, avg loss 1/3
        let out = rsi(&[10.0, 12.0, 11.0, 12.0], 3);
        assert_approx(out[3].unwrap(), 75.0);
    }

    #[test]
    fn macd_warm_up() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let m = macd(&closes, 12, 26, 9);
        assert!(m.line[24].is_none());
        assert!(m.line[25].is_some());
        assert!(m.signal[32].is_none());
        assert!(m.signal[33].is_some());
        assert!(m.histogram[33].is_some());
        // steady trend: the fast EMA sits above the slow one
        assert!(m.line[39].unwrap() > 0.0);
    }

    #[test]
    fn stochastic_at_range_top() {
        let series = make_series(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let (k, d) = stochastic(series.bars(), 3, 2);
        assert!(k[1].is_none());
        // close 12, window high 13, window low 9
        assert_approx(k[2].unwrap(), 75.0);
        assert!(d[2].is_none());
        assert!(d[3].is_some());
    }

    #[test]
    fn cci_flat_is_zero() {
        let series = make_series(&[50.0; 25]);
        let out = cci(series.bars(), 20);
        assert!(out[18].is_none());
        assert_approx(out[24].unwrap(), 0.0);
    }

    #[test]
    fn cmo_and_roc() {
        let closes = [10.0, 11.0, 10.0, 12.0];
        let c = cmo(&closes, 3);
        // up 3, down 1
        assert_approx(c[3].unwrap(), 50.0);
        let r = roc(&closes, 3);
        assert!(r[2].is_none());
        assert_approx(r[3].unwrap(), 20.0);
    }

    #[test]
    fn tema_tracks_linear_trend() {
        let closes: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let out = tema(&closes, 3);
        assert!(out[5].is_none());
        assert!(out[6].is_some());
        // TEMA removes EMA lag on a straight line
        assert_approx(out[29].unwrap(), 29.0);
    }

    #[test]
    fn trix_and_tsi_warm_up() {
        let closes: Vec<f64> = (0..60).map(|i| 50.0 + (i as f64 * 0.3).sin()).collect();
        let (line, signal) = trix(&closes, 5, 3);
        assert!(line[12].is_none());
        assert!(line[13].is_some());
        assert!(signal[14].is_none());
        assert!(signal[15].is_some());

        let (tsi_line, tsi_signal) = tsi(&closes, 25, 13, 7);
        assert!(tsi_line[36].is_none());
        assert!(tsi_line[37].is_some());
        assert!(tsi_signal[43].is_some());
    }
}
