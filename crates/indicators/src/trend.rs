//! Directional and trend-following indicators.
//!
//! Warm-up:
//! - ADX(n): DI+/DI- at n, ADX at 2n-1
//! - Aroon(n), Vortex(n): n
//! - Parabolic SAR: 1
//! - SuperTrend(n, f): n-1
//! - Ichimoku(t, k, b): tenkan at t-1, kijun at k-1, senkou A at max(t,k)+k-1,
//!   senkou B at b+k-1 (both spans are shifted forward by k bars)

use core_types::Bar;

use crate::series::{rolling_max, rolling_min, undefined, Series};
use crate::volatility::{atr, true_range};

pub struct Adx {
    pub adx: Series,
    pub plus_di: Series,
    pub minus_di: Series,
}

/// Wilder's Average Directional Index.
pub fn adx(bars: &[Bar], period: usize) -> Adx {
    let n = bars.len();
    let mut result = Adx {
        adx: undefined(n),
        plus_di: undefined(n),
        minus_di: undefined(n),
    };
    if period == 0 || n < 2 * period {
        return result;
    }

    let tr = true_range(bars);
    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    for i in 1..n {
        let up = bars[i].high - bars[i - 1].high;
        let down = bars[i - 1].low - bars[i].low;
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
    }

    // Wilder running sums start from the first bar with a previous bar.
    let mut s_tr: f64 = tr[1..=period].iter().sum();
    let mut s_plus: f64 = plus_dm[1..=period].iter().sum();
    let mut s_minus: f64 = minus_dm[1..=period].iter().sum();
    let p = period as f64;

    let mut dx = undefined(n);
    for i in period..n {
        if i > period {
            s_tr = s_tr - s_tr / p + tr[i];
            s_plus = s_plus - s_plus / p + plus_dm[i];
            s_minus = s_minus - s_minus / p + minus_dm[i];
        }
        let (pdi, mdi) = if s_tr == 0.0 {
            (0.0, 0.0)
        } else {
            (100.0 * s_plus / s_tr, 100.0 * s_minus / s_tr)
        };
        result.plus_di[i] = Some(pdi);
        result.minus_di[i] = Some(mdi);
        dx[i] = Some(if pdi + mdi == 0.0 {
            0.0
        } else {
            100.0 * (pdi - mdi).abs() / (pdi + mdi)
        });
    }

    let first = 2 * period - 1;
    let seed: f64 = dx[period..=first].iter().flatten().sum::<f64>() / p;
    let mut prev = seed;
    result.adx[first] = Some(prev);
    for i in (first + 1)..n {
        if let Some(d) = dx[i] {
            prev = (prev * (p - 1.0) + d) / p;
            result.adx[i] = Some(prev);
        }
    }
    result
}

/// Aroon up/down over a window of `period + 1` bars.
pub fn aroon(bars: &[Bar], period: usize) -> (Series, Series) {
    let n = bars.len();
    let mut up = undefined(n);
    let mut down = undefined(n);
    if period == 0 {
        return (up, down);
    }
    for i in period..n {
        let window = &bars[i - period..=i];
        // Ties resolve to the most recent extreme.
        let mut hi_idx = 0;
        let mut lo_idx = 0;
        for (j, bar) in window.iter().enumerate() {
            if bar.high >= window[hi_idx].high {
                hi_idx = j;
            }
            if bar.low <= window[lo_idx].low {
                lo_idx = j;
            }
        }
        let p = period as f64;
        up[i] = Some(100.0 * hi_idx as f64 / p);
        down[i] = Some(100.0 * lo_idx as f64 / p);
    }
    (up, down)
}

/// Vortex indicator: (VI+, VI-).
pub fn vortex(bars: &[Bar], period: usize) -> (Series, Series) {
    let n = bars.len();
    let mut plus = undefined(n);
    let mut minus = undefined(n);
    if period == 0 || n < period + 1 {
        return (plus, minus);
    }
    let tr = true_range(bars);
    let mut vm_plus = vec![0.0; n];
    let mut vm_minus = vec![0.0; n];
    for i in 1..n {
        vm_plus[i] = (bars[i].high - bars[i - 1].low).abs();
        vm_minus[i] = (bars[i].low - bars[i - 1].high).abs();
    }
    for i in period..n {
        let range = (i + 1 - period)..=i;
        let tr_sum: f64 = tr[range.clone()].iter().sum();
        if tr_sum == 0.0 {
            continue;
        }
        plus[i] = Some(vm_plus[range.clone()].iter().sum::<f64>() / tr_sum);
        minus[i] = Some(vm_minus[range].iter().sum::<f64>() / tr_sum);
    }
    (plus, minus)
}

/// Parabolic SAR and trend direction (+1 long, -1 short).
pub fn parabolic_sar(bars: &[Bar], step: f64, max_step: f64) -> (Series, Series) {
    let n = bars.len();
    let mut sar_out = undefined(n);
    let mut dir_out = undefined(n);
    if n < 2 {
        return (sar_out, dir_out);
    }

    let mut long = bars[1].close >= bars[0].close;
    let mut af = step;
    let mut ep = if long {
        bars[0].high.max(bars[1].high)
    } else {
        bars[0].low.min(bars[1].low)
    };
    let mut sar = if long {
        bars[0].low.min(bars[1].low)
    } else {
        bars[0].high.max(bars[1].high)
    };
    sar_out[1] = Some(sar);
    dir_out[1] = Some(if long { 1.0 } else { -1.0 });

    for i in 2..n {
        let bar = &bars[i];
        let mut next = sar + af * (ep - sar);
        if long {
            next = next.min(bars[i - 1].low).min(bars[i - 2].low);
            if bar.low < next {
                long = false;
                next = ep;
                ep = bar.low;
                af = step;
            } else if bar.high > ep {
                ep = bar.high;
                af = (af + step).min(max_step);
            }
        } else {
            next = next.max(bars[i - 1].high).max(bars[i - 2].high);
            if bar.high > next {
                long = true;
                next = ep;
                ep = bar.high;
                af = step;
            } else if bar.low < ep {
                ep = bar.low;
                af = (af + step).min(max_step);
            }
        }
        sar = next;
        sar_out[i] = Some(sar);
        dir_out[i] = Some(if long { 1.0 } else { -1.0 });
    }
    (sar_out, dir_out)
}

/// SuperTrend line and direction (+1 up, -1 down).
///
/// The line is the final lower band while trending up and the final upper band
/// while trending down.
pub fn supertrend(bars: &[Bar], period: usize, factor: f64) -> (Series, Series) {
    let n = bars.len();
    let mut line = undefined(n);
    let mut direction = undefined(n);
    let range = atr(bars, period);
    let Some(start) = range.iter().position(Option::is_some) else {
        return (line, direction);
    };

    let mut final_upper = 0.0;
    let mut final_lower = 0.0;
    let mut up = true;
    for i in start..n {
        let Some(a) = range[i] else { break };
        let hl2 = bars[i].median_price();
        let basic_upper = hl2 + factor * a;
        let basic_lower = hl2 - factor * a;
        let close = bars[i].close;

        if i == start {
            final_upper = basic_upper;
            final_lower = basic_lower;
            up = close >= hl2;
        } else {
            let prev_close = bars[i - 1].close;
            if basic_upper < final_upper || prev_close > final_upper {
                final_upper = basic_upper;
            }
            if basic_lower > final_lower || prev_close < final_lower {
                final_lower = basic_lower;
            }
            if up && close < final_lower {
                up = false;
            } else if !up && close > final_upper {
                up = true;
            }
        }

        line[i] = Some(if up { final_lower } else { final_upper });
        direction[i] = Some(if up { 1.0 } else { -1.0 });
    }
    (line, direction)
}

pub struct Ichimoku {
    pub tenkan: Series,
    pub kijun: Series,
    pub senkou_a: Series,
    pub senkou_b: Series,
}

pub fn ichimoku(bars: &[Bar], tenkan: usize, kijun: usize, senkou_b: usize) -> Ichimoku {
    let n = bars.len();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let midpoint = |period: usize| -> Series {
        rolling_max(&highs, period)
            .into_iter()
            .zip(rolling_min(&lows, period))
            .map(|(h, l)| Some((h? + l?) / 2.0))
            .collect()
    };

    let tenkan_line = midpoint(tenkan);
    let kijun_line = midpoint(kijun);
    let span_b = midpoint(senkou_b);

    let mut senkou_a = undefined(n);
    let mut senkou_b_line = undefined(n);
    for i in kijun..n {
        let src = i - kijun;
        if let (Some(t), Some(k)) = (tenkan_line[src], kijun_line[src]) {
            senkou_a[i] = Some((t + k) / 2.0);
        }
        senkou_b_line[i] = span_b[src];
    }

    Ichimoku {
        tenkan: tenkan_line,
        kijun: kijun_line,
        senkou_a,
        senkou_b: senkou_b_line,
    }
}
