use std::fmt;

use core_types::Bar;

use crate::series::{defined, ema, sma, undefined, Series};
use crate::{momentum, patterns, trend, volatility, volume};

/// Which bar field a moving average is taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Open,
    High,
    Low,
    Close,
    Volume,
    /// (high + low + close) / 3
    Typical,
    /// (high + low) / 2
    Median,
}

impl Source {
    pub fn extract(&self, bars: &[Bar]) -> Vec<f64> {
        bars.iter()
            .map(|b| match self {
                Source::Open => b.open,
                Source::High => b.high,
                Source::Low => b.low,
                Source::Close => b.close,
                Source::Volume => b.volume as f64,
                Source::Typical => b.typical_price(),
                Source::Median => b.median_price(),
            })
            .collect()
    }

    fn as_str(&self) -> &'static str {
        match self {
            Source::Open => "open",
            Source::High => "high",
            Source::Low => "low",
            Source::Close => "close",
            Source::Volume => "volume",
            Source::Typical => "typical",
            Source::Median => "median",
        }
    }
}

/// Names the individual output lines of multi-line indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Line {
    Main,
    Signal,
    Histogram,
    Upper,
    Middle,
    Lower,
    Plus,
    Minus,
    K,
    D,
    Up,
    Down,
    Tenkan,
    Kijun,
    SenkouA,
    SenkouB,
    Direction,
    Open,
    High,
    Low,
    Close,
    R1,
    R2,
    S1,
    S2,
    LongStop,
    ShortStop,
}

/// An indicator together with its parameters.
///
/// Two specs with the same [`key`](IndicatorSpec::key) are the same
/// computation, which is what lets many strategies share one result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorSpec {
    Sma { source: Source, period: usize },
    Ema { source: Source, period: usize },
    Tema { period: usize },
    Rsi { period: usize },
    Macd { fast: usize, slow: usize, signal: usize },
    Bollinger { period: usize, std_dev: f64 },
    Atr { period: usize },
    Adx { period: usize },
    Stochastic { k: usize, d: usize },
    Cci { period: usize },
    Mfi { period: usize },
    Obv,
    Vwap,
    Ichimoku { tenkan: usize, kijun: usize, senkou_b: usize },
    Psar { step: f64, max_step: f64 },
    Tsi { long: usize, short: usize, signal: usize },
    AwesomeOscillator { fast: usize, slow: usize },
    Cmo { period: usize },
    Aroon { period: usize },
    Keltner { ema_period: usize, atr_period: usize, multiplier: f64 },
    Vortex { period: usize },
    Fractal,
    Pivot { lookback: usize },
    SuperTrend { period: usize, factor: f64 },
    HeikinAshi,
    Trix { period: usize, signal: usize },
    Cmf { period: usize },
    Roc { period: usize },
    Donchian { period: usize },
    Chandelier { period: usize, multiplier: f64 },
}

impl IndicatorSpec {
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Fewest bars for which at least one point of every output line can be
    /// defined. Shorter series produce entirely undefined output.
    pub fn min_history(&self) -> usize {
        use IndicatorSpec::*;
        match *self {
            Sma { period, .. } | Ema { period, .. } => period,
            Tema { period } => (3 * period).saturating_sub(2),
            Rsi { period } | Mfi { period } | Cmo { period } | Aroon { period } => period + 1,
            Vortex { period } | Roc { period } => period + 1,
            Macd { slow, signal, .. } => (slow + signal).saturating_sub(1),
            Bollinger { period, .. } | Atr { period } | Cci { period } | Cmf { period } => period,
            Donchian { period } | Chandelier { period, .. } | SuperTrend { period, .. } => period,
            Adx { period } => 2 * period,
            Stochastic { k, d } => (k + d).saturating_sub(1),
            Obv | Vwap | HeikinAshi => 1,
            Ichimoku {
                tenkan,
                kijun,
                senkou_b,
            } => tenkan.max(kijun).max(senkou_b) + kijun,
            Psar { .. } => 2,
            Tsi {
                long,
                short,
                signal,
            } => (long + short + signal).saturating_sub(1),
            AwesomeOscillator { fast, slow } => fast.max(slow),
            Keltner {
                ema_period,
                atr_period,
                ..
            } => ema_period.max(atr_period),
            Fractal => 5,
            Pivot { lookback } => lookback + 1,
            Trix { period, signal } => (3 * period + signal).saturating_sub(2),
        }
    }

    /// The lines this indicator produces, in output order.
    pub fn lines(&self) -> &'static [Line] {
        use IndicatorSpec::*;
        match self {
            Macd { .. } => &[Line::Main, Line::Signal, Line::Histogram],
            Bollinger { .. } | Keltner { .. } | Donchian { .. } => {
                &[Line::Upper, Line::Middle, Line::Lower]
            }
            Adx { .. } => &[Line::Main, Line::Plus, Line::Minus],
            Stochastic { .. } => &[Line::K, Line::D],
            Ichimoku { .. } => &[Line::Tenkan, Line::Kijun, Line::SenkouA, Line::SenkouB],
            Psar { .. } | SuperTrend { .. } => &[Line::Main, Line::Direction],
            Tsi { .. } | Trix { .. } => &[Line::Main, Line::Signal],
            Aroon { .. } | Fractal => &[Line::Up, Line::Down],
            Vortex { .. } => &[Line::Plus, Line::Minus],
            Pivot { .. } => &[Line::Main, Line::R1, Line::R2, Line::S1, Line::S2],
            HeikinAshi => &[Line::Open, Line::High, Line::Low, Line::Close],
            Chandelier { .. } => &[Line::LongStop, Line::ShortStop],
            _ => &[Line::Main],
        }
    }

    /// Computes every line over `bars`, aligned index-for-index.
    pub fn compute(&self, bars: &[Bar]) -> Vec<(Line, Series)> {
        let n = bars.len();
        if n < self.min_history() {
            return self.lines().iter().map(|line| (*line, undefined(n))).collect();
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        use IndicatorSpec::*;
        match *self {
            Sma { source, period } => vec![(Line::Main, sma(&defined(&source.extract(bars)), period))],
            Ema { source, period } => vec![(Line::Main, ema(&defined(&source.extract(bars)), period))],
            Tema { period } => vec![(Line::Main, momentum::tema(&closes, period))],
            Rsi { period } => vec![(Line::Main, momentum::rsi(&closes, period))],
            Macd { fast, slow, signal } => {
                let m = momentum::macd(&closes, fast, slow, signal);
                vec![
                    (Line::Main, m.line),
                    (Line::Signal, m.signal),
                    (Line::Histogram, m.histogram),
                ]
            }
            Bollinger { period, std_dev } => bands(volatility::bollinger(&closes, period, std_dev)),
            Atr { period } => vec![(Line::Main, volatility::atr(bars, period))],
            Adx { period } => {
                let a = trend::adx(bars, period);
                vec![
                    (Line::Main, a.adx),
                    (Line::Plus, a.plus_di),
                    (Line::Minus, a.minus_di),
                ]
            }
            Stochastic { k, d } => {
                let (k_line, d_line) = momentum::stochastic(bars, k, d);
                vec![(Line::K, k_line), (Line::D, d_line)]
            }
            Cci { period } => vec![(Line::Main, momentum::cci(bars, period))],
            Mfi { period } => vec![(Line::Main, volume::mfi(bars, period))],
            Obv => vec![(Line::Main, volume::obv(bars))],
            Vwap => vec![(Line::Main, volume::vwap(bars))],
            Ichimoku {
                tenkan,
                kijun,
                senkou_b,
            } => {
                let i = trend::ichimoku(bars, tenkan, kijun, senkou_b);
                vec![
                    (Line::Tenkan, i.tenkan),
                    (Line::Kijun, i.kijun),
                    (Line::SenkouA, i.senkou_a),
                    (Line::SenkouB, i.senkou_b),
                ]
            }
            Psar { step, max_step } => {
                let (sar, dir) = trend::parabolic_sar(bars, step, max_step);
                vec![(Line::Main, sar), (Line::Direction, dir)]
            }
            Tsi {
                long,
                short,
                signal,
            } => {
                let (line, sig) = momentum::tsi(&closes, long, short, signal);
                vec![(Line::Main, line), (Line::Signal, sig)]
            }
            AwesomeOscillator { fast, slow } => {
                vec![(Line::Main, momentum::awesome_oscillator(bars, fast, slow))]
            }
            Cmo { period } => vec![(Line::Main, momentum::cmo(&closes, period))],
            Aroon { period } => {
                let (up, down) = trend::aroon(bars, period);
                vec![(Line::Up, up), (Line::Down, down)]
            }
            Keltner {
                ema_period,
                atr_period,
                multiplier,
            } => bands(volatility::keltner(bars, ema_period, atr_period, multiplier)),
            Vortex { period } => {
                let (plus, minus) = trend::vortex(bars, period);
                vec![(Line::Plus, plus), (Line::Minus, minus)]
            }
            Fractal => {
                let (up, down) = patterns::fractals(bars);
                vec![(Line::Up, up), (Line::Down, down)]
            }
            Pivot { lookback } => {
                let p = patterns::pivots(bars, lookback);
                vec![
                    (Line::Main, p.pivot),
                    (Line::R1, p.r1),
                    (Line::R2, p.r2),
                    (Line::S1, p.s1),
                    (Line::S2, p.s2),
                ]
            }
            SuperTrend { period, factor } => {
                let (line, dir) = trend::supertrend(bars, period, factor);
                vec![(Line::Main, line), (Line::Direction, dir)]
            }
            HeikinAshi => {
                let ha = patterns::heikin_ashi(bars);
                vec![
                    (Line::Open, ha.open),
                    (Line::High, ha.high),
                    (Line::Low, ha.low),
                    (Line::Close, ha.close),
                ]
            }
            Trix { period, signal } => {
                let (line, sig) = momentum::trix(&closes, period, signal);
                vec![(Line::Main, line), (Line::Signal, sig)]
            }
            Cmf { period } => vec![(Line::Main, volume::cmf(bars, period))],
            Roc { period } => vec![(Line::Main, momentum::roc(&closes, period))],
            Donchian { period } => bands(volatility::donchian(bars, period)),
            Chandelier { period, multiplier } => {
                let (long_stop, short_stop) = volatility::chandelier(bars, period, multiplier);
                vec![(Line::LongStop, long_stop), (Line::ShortStop, short_stop)]
            }
        }
    }
}

fn bands(b: volatility::Bands) -> Vec<(Line, Series)> {
    vec![
        (Line::Upper, b.upper),
        (Line::Middle, b.middle),
        (Line::Lower, b.lower),
    ]
}

impl fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use IndicatorSpec::*;
        match self {
            Sma { source, period } => write!(f, "sma({},{period})", source.as_str()),
            Ema { source, period } => write!(f, "ema({},{period})", source.as_str()),
            Tema { period } => write!(f, "tema({period})"),
            Rsi { period } => write!(f, "rsi({period})"),
            Macd { fast, slow, signal } => write!(f, "macd({fast},{slow},{signal})"),
            Bollinger { period, std_dev } => write!(f, "bollinger({period},{std_dev})"),
            Atr { period } => write!(f, "atr({period})"),
            Adx { period } => write!(f, "adx({period})"),
            Stochastic { k, d } => write!(f, "stochastic({k},{d})"),
            Cci { period } => write!(f, "cci({period})"),
            Mfi { period } => write!(f, "mfi({period})"),
            Obv => f.write_str("obv"),
            Vwap => f.write_str("vwap"),
            Ichimoku {
                tenkan,
                kijun,
                senkou_b,
            } => write!(f, "ichimoku({tenkan},{kijun},{senkou_b})"),
            Psar { step, max_step } => write!(f, "psar({step},{max_step})"),
            Tsi {
                long,
                short,
                signal,
            } => write!(f, "tsi({long},{short},{signal})"),
            AwesomeOscillator { fast, slow } => write!(f, "ao({fast},{slow})"),
            Cmo { period } => write!(f, "cmo({period})"),
            Aroon { period } => write!(f, "aroon({period})"),
            Keltner {
                ema_period,
                atr_period,
                multiplier,
            } => write!(f, "keltner({ema_period},{atr_period},{multiplier})"),
            Vortex { period } => write!(f, "vortex({period})"),
            Fractal => f.write_str("fractal"),
            Pivot { lookback } => write!(f, "pivot({lookback})"),
            SuperTrend { period, factor } => write!(f, "supertrend({period},{factor})"),
            HeikinAshi => f.write_str("heikin_ashi"),
            Trix { period, signal } => write!(f, "trix({period},{signal})"),
            Cmf { period } => write!(f, "cmf({period})"),
            Roc { period } => write!(f, "roc({period})"),
            Donchian { period } => write!(f, "donchian({period})"),
            Chandelier { period, multiplier } => write!(f, "chandelier({period},{multiplier})"),
        }
    }
}
