//! Volume-weighted indicators.

use core_types::Bar;

use crate::series::{undefined, Series};

/// On-balance volume, starting at 0 on the first bar.
pub fn obv(bars: &[Bar]) -> Series {
    let mut out = undefined(bars.len());
    let mut total = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            let prev = bars[i - 1].close;
            if bar.close > prev {
                total += bar.volume as f64;
            } else if bar.close < prev {
                total -= bar.volume as f64;
            }
        }
        out[i] = Some(total);
    }
    out
}

/// Session VWAP on typical price. The accumulation restarts whenever the UTC
/// calendar date changes. Undefined while the session has seen no volume.
pub fn vwap(bars: &[Bar]) -> Series {
    let mut out = undefined(bars.len());
    let mut session = None;
    let (mut pv, mut vol) = (0.0, 0.0);
    for (i, bar) in bars.iter().enumerate() {
        let day = bar.timestamp.date_naive();
        if session != Some(day) {
            session = Some(day);
            pv = 0.0;
            vol = 0.0;
        }
        pv += bar.typical_price() * bar.volume as f64;
        vol += bar.volume as f64;
        if vol > 0.0 {
            out[i] = Some(pv / vol);
        }
    }
    out
}

/// Money Flow Index over `period` typical-price changes. A window without
/// negative flow reads 100 (50 if it has no flow at all).
pub fn mfi(bars: &[Bar], period: usize) -> Series {
    let n = bars.len();
    let mut out = undefined(n);
    if period == 0 {
        return out;
    }
    let tp: Vec<f64> = bars.iter().map(Bar::typical_price).collect();
    for i in period..n {
        let (mut pos, mut neg) = (0.0, 0.0);
        for j in (i + 1 - period)..=i {
            let flow = tp[j] * bars[j].volume as f64;
            if tp[j] > tp[j - 1] {
                pos += flow;
            } else if tp[j] < tp[j - 1] {
                neg += flow;
            }
        }
        out[i] = Some(if neg == 0.0 {
            if pos == 0.0 { 50.0 } else { 100.0 }
        } else {
            100.0 - 100.0 / (1.0 + pos / neg)
        });
    }
    out
}

/// Chaikin Money Flow.
pub fn cmf(bars: &[Bar], period: usize) -> Series {
    let n = bars.len();
    let mut out = undefined(n);
    if period == 0 {
        return out;
    }
    let mfv: Vec<f64> = bars
        .iter()
        .map(|b| {
            let range = b.high - b.low;
            if range == 0.0 {
                0.0
            } else {
                ((b.close - b.low) - (b.high - b.close)) / range * b.volume as f64
            }
        })
        .collect();
    for i in (period - 1)..n {
        let window = (i + 1 - period)..=i;
        let vol: f64 = bars[window.clone()].iter().map(|b| b.volume as f64).sum();
        if vol > 0.0 {
            out[i] = Some(mfv[window].iter().sum::<f64>() / vol);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert_approx, make_series};
    use chrono::{Duration, TimeZone, Utc};
    use core_types::{normalize, RawBar, Timeframe};

    #[test]
    fn obv_accumulates_signed_volume() {
        let series = make_series(&[10.0, 11.0, 10.5, 10.5]);
        let out = obv(series.bars());
        assert_eq!(out, vec![Some(0.0), Some(1000.0), Some(0.0), Some(0.0)]);
    }

    #[test]
    fn vwap_resets_each_session() {
        let day1 = Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap();
        let day2 = day1 + Duration::days(1);
        let bar = |timestamp, price: f64, volume| RawBar {
            timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        };
        let raw = vec![
            bar(day1, 10.0, 100),
            bar(day1 + Duration::minutes(1), 20.0, 300),
            bar(day2, 50.0, 10),
        ];
        let series = normalize("SPY", Timeframe::OneMinute, raw).unwrap();
        let out = vwap(series.bars());
        assert_approx(out[0].unwrap(), 10.0);
        assert_approx(out[1].unwrap(), 17.5);
        assert_approx(out[2].unwrap(), 50.0);
    }

    #[test]
    fn mfi_only_positive_flow() {
        let series = make_series(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let out = mfi(series.bars(), 3);
        assert!(out[2].is_none());
        assert_approx(out[3].unwrap(), 100.0);
    }

    #[test]
    fn cmf_close_at_high_is_one() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap();
        let raw = (0..5)
            .map(|i| RawBar {
                timestamp: start + Duration::minutes(i),
                open: 10.0,
                high: 12.0,
                low: 9.0,
                close: 12.0,
                volume: 500,
            })
            .collect();
        let series = normalize("SPY", Timeframe::OneMinute, raw).unwrap();
        let out = cmf(series.bars(), 3);
        assert!(out[1].is_none());
        assert_approx(out[4].unwrap(), 1.0);
    }
}
