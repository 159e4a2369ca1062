//! Aligned value series and the rolling helpers every indicator is built from.
//!
//! A `Series` has exactly one slot per bar. `None` marks a point where the
//! indicator is not yet (or not at all) defined; it is never encoded as `0.0`
//! or `NaN`.

pub type Series = Vec<Option<f64>>;

/// A series of `len` undefined points.
pub fn undefined(len: usize) -> Series {
    vec![None; len]
}

pub fn defined(values: &[f64]) -> Series {
    values.iter().copied().map(Some).collect()
}

/// Simple moving average. First value at index `period - 1` of the first
/// fully defined window.
pub fn sma(values: &[Option<f64>], period: usize) -> Series {
    let mut out = undefined(values.len());
    if period == 0 {
        return out;
    }
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        if let Some(sum) = window.iter().copied().sum::<Option<f64>>() {
            out[i] = Some(sum / period as f64);
        }
    }
    out
}

/// Exponential moving average, alpha = 2 / (period + 1).
///
/// Leading undefined points are skipped; the EMA is seeded with the SMA of the
/// first `period` defined values, so the first output lands `period - 1` bars
/// after the first defined input.
pub fn ema(values: &[Option<f64>], period: usize) -> Series {
    smoothed(values, period, 2.0 / (period as f64 + 1.0))
}

/// Wilder's smoothing (alpha = 1 / period), seeded the same way as [`ema`].
pub fn wilder(values: &[Option<f64>], period: usize) -> Series {
    smoothed(values, period, 1.0 / period as f64)
}

fn smoothed(values: &[Option<f64>], period: usize, alpha: f64) -> Series {
    let n = values.len();
    let mut out = undefined(n);
    if period == 0 {
        return out;
    }
    let Some(start) = values.iter().position(Option::is_some) else {
        return out;
    };
    let seed_end = start + period - 1;
    if seed_end >= n {
        return out;
    }
    let Some(seed_sum) = values[start..=seed_end].iter().copied().sum::<Option<f64>>() else {
        return out;
    };

    let mut prev = seed_sum / period as f64;
    out[seed_end] = Some(prev);
    for i in (seed_end + 1)..n {
        // A gap after the seed ends the series.
        let Some(v) = values[i] else { break };
        prev = alpha * v + (1.0 - alpha) * prev;
        out[i] = Some(prev);
    }
    out
}

/// Highest value over the trailing `period` points.
pub fn rolling_max(values: &[f64], period: usize) -> Series {
    rolling(values, period, |w| w.iter().copied().fold(f64::MIN, f64::max))
}

/// Lowest value over the trailing `period` points.
pub fn rolling_min(values: &[f64], period: usize) -> Series {
    rolling(values, period, |w| w.iter().copied().fold(f64::MAX, f64::min))
}

pub fn rolling_sum(values: &[f64], period: usize) -> Series {
    rolling(values, period, |w| w.iter().sum())
}

fn rolling(values: &[f64], period: usize, f: impl Fn(&[f64]) -> f64) -> Series {
    let mut out = undefined(values.len());
    if period == 0 {
        return out;
    }
    for i in (period.saturating_sub(1))..values.len() {
        out[i] = Some(f(&values[i + 1 - period..=i]));
    }
    out
}

/// Applies `f` wherever both inputs are defined.
pub fn zip_with(a: &[Option<f64>], b: &[Option<f64>], f: impl Fn(f64, f64) -> f64) -> Series {
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some(f(*x, *y)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx;

    #[test]
    fn ema_3_known_values() {
        let out = ema(&defined(&[10.0, 11.0, 12.0, 13.0]), 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_approx(out[2].unwrap(), 11.0);
        assert_approx(out[3].unwrap(), 12.0);
    }

    #[test]
    fn ema_skips_leading_gaps() {
        let input = vec![None, None, Some(2.0), Some(4.0), Some(6.0)];
        let out = ema(&input, 2);
        assert_eq!(&out[..3], &[None, None, None]);
        assert_approx(out[3].unwrap(), 3.0);
        // alpha = 2/3: 2/3 * 6 + 1/3 * 3
        assert_approx(out[4].unwrap(), 5.0);
    }

    #[test]
    fn sma_requires_full_window() {
        let out = sma(&defined(&[1.0, 2.0, 3.0, 4.0]), 2);
        assert_eq!(out, vec![None, Some(1.5), Some(2.5), Some(3.5)]);

        let gappy = vec![Some(1.0), None, Some(3.0), Some(5.0)];
        assert_eq!(sma(&gappy, 2), vec![None, None, None, Some(4.0)]);
    }

    #[test]
    fn short_input_is_entirely_undefined() {
        assert!(ema(&defined(&[1.0, 2.0]), 5).iter().all(Option::is_none));
        assert!(rolling_max(&[1.0], 3).iter().all(Option::is_none));
    }

    #[test]
    fn rolling_extremes() {
        let v = [3.0, 1.0, 4.0, 1.0, 5.0];
        assert_eq!(rolling_max(&v, 3), vec![None, None, Some(4.0), Some(4.0), Some(5.0)]);
        assert_eq!(rolling_min(&v, 3), vec![None, None, Some(1.0), Some(1.0), Some(1.0)]);
    }
}
