//! Price-structure indicators: Williams fractals, floor pivots and Heikin-Ashi
//! candles.

use core_types::Bar;

use crate::series::{undefined, Series};

/// Williams 5-bar fractals.
///
/// Bar `j` is an up fractal when its high is strictly above the highs of the
/// two bars on each side; a down fractal mirrors that on lows. A fractal is
/// only known two bars later, so at index `i` the series holds the level of
/// the latest fractal at or before `i - 2`. Returns (up levels, down levels).
pub fn fractals(bars: &[Bar]) -> (Series, Series) {
    let n = bars.len();
    let mut up = undefined(n);
    let mut down = undefined(n);
    let (mut last_up, mut last_down) = (None, None);
    for i in 4..n {
        let j = i - 2;
        let centre = &bars[j];
        let neighbours = [&bars[j - 2], &bars[j - 1], &bars[j + 1], &bars[j + 2]];
        if neighbours.iter().all(|b| centre.high > b.high) {
            last_up = Some(centre.high);
        }
        if neighbours.iter().all(|b| centre.low < b.low) {
            last_down = Some(centre.low);
        }
        up[i] = last_up;
        down[i] = last_down;
    }
    (up, down)
}

pub struct Pivots {
    pub pivot: Series,
    pub r1: Series,
    pub r2: Series,
    pub s1: Series,
    pub s2: Series,
}

/// Classic floor pivots from the `lookback` bars before each bar: high is
/// their highest high, low their lowest low, close the previous bar's close.
pub fn pivots(bars: &[Bar], lookback: usize) -> Pivots {
    let n = bars.len();
    let mut out = Pivots {
        pivot: undefined(n),
        r1: undefined(n),
        r2: undefined(n),
        s1: undefined(n),
        s2: undefined(n),
    };
    if lookback == 0 {
        return out;
    }
    for i in lookback..n {
        let window = &bars[i - lookback..i];
        let high = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let close = bars[i - 1].close;
        let p = (high + low + close) / 3.0;
        out.pivot[i] = Some(p);
        out.r1[i] = Some(2.0 * p - low);
        out.s1[i] = Some(2.0 * p - high);
        out.r2[i] = Some(p + (high - low));
        out.s2[i] = Some(p - (high - low));
    }
    out
}

pub struct HeikinAshi {
    pub open: Series,
    pub high: Series,
    pub low: Series,
    pub close: Series,
}

pub fn heikin_ashi(bars: &[Bar]) -> HeikinAshi {
    let n = bars.len();
    let mut ha = HeikinAshi {
        open: undefined(n),
        high: undefined(n),
        low: undefined(n),
        close: undefined(n),
    };
    let mut prev: Option<(f64, f64)> = None;
    for (i, bar) in bars.iter().enumerate() {
        let close = (bar.open + bar.high + bar.low + bar.close) / 4.0;
        let open = match prev {
            None => (bar.open + bar.close) / 2.0,
            Some((po, pc)) => (po + pc) / 2.0,
        };
        ha.open[i] = Some(open);
        ha.close[i] = Some(close);
        ha.high[i] = Some(bar.high.max(open).max(close));
        ha.low[i] = Some(bar.low.min(open).min(close));
        prev = Some((open, close));
    }
    ha
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert_approx, make_series};

    fn from_ranges(ranges: &[(f64, f64)]) -> core_types::BarSeries {
        use chrono::{Duration, TimeZone, Utc};
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap();
        let raw = ranges
            .iter()
            .enumerate()
            .map(|(i, &(high, low))| core_types::RawBar {
                timestamp: start + Duration::minutes(i as i64),
                open: (high + low) / 2.0,
                high,
                low,
                close: (high + low) / 2.0,
                volume: 100,
            })
            .collect();
        core_types::normalize("TEST", core_types::Timeframe::OneMinute, raw).unwrap()
    }

    #[test]
    fn fractal_confirmed_two_bars_later() {
        let series = from_ranges(&[
            (11.0, 9.0),
            (12.0, 10.0),
            (16.0, 11.0),
            (13.0, 10.0),
            (12.0, 8.0),
            (12.5, 9.5),
            (13.0, 10.0),
        ]);
        let (up, down) = fractals(series.bars());
        assert!(up[3].is_none());
        // bar 2 (high 16) becomes visible at bar 4
        assert_eq!(up[4], Some(16.0));
        assert_eq!(up[6], Some(16.0));
        // bar 4 (low 8) is confirmed at bar 6
        assert!(down[5].is_none());
        assert_eq!(down[6], Some(8.0));
    }

    #[test]
    fn pivots_use_prior_bars() {
        let series = make_series(&[10.0, 12.0, 11.0, 13.0]);
        let out = pivots(series.bars(), 3);
        assert!(out.pivot[2].is_none());
        // prior bars: high 13, low 9, previous close 11
        assert_approx(out.pivot[3].unwrap(), 11.0);
        assert_approx(out.r1[3].unwrap(), 13.0);
        assert_approx(out.s1[3].unwrap(), 9.0);
        assert_approx(out.r2[3].unwrap(), 15.0);
        assert_approx(out.s2[3].unwrap(), 7.0);
    }

    #[test]
    fn heikin_ashi_first_candle() {
        let series = make_series(&[10.0, 12.0]);
        let ha = heikin_ashi(series.bars());
        assert_approx(ha.open[0].unwrap(), 10.0);
        assert_approx(ha.close[0].unwrap(), 10.0);
        assert_approx(ha.open[1].unwrap(), 10.0);
        // (10 + 13 + 9 + 12) / 4
        assert_approx(ha.close[1].unwrap(), 11.0);
    }
}
