// In crates/analytics/src/engine.rs

use std::collections::BTreeMap;

use core_types::{BarSeries, ScanReport, ScanSummary, Signal, SymbolSnapshot};
use itertools::Itertools;

/// Tallies a scan report's results and snapshots each symbol's series.
///
/// Pure: the same report always produces the same summary.
pub fn summarize(report: &ScanReport) -> ScanSummary {
    // 1. Signal counts.
    let counts = report.results.iter().counts_by(|r| r.signal);
    let count = |signal| counts.get(&signal).copied().unwrap_or(0);

    // 2. Symbols with at least one BUY or SELL.
    let symbols_with_signals = report
        .actionable()
        .map(|r| r.symbol.as_str())
        .unique()
        .count();

    // 3. Display figures from each series tail.
    let snapshots: BTreeMap<String, SymbolSnapshot> = report
        .market_data
        .iter()
        .filter_map(|(symbol, series)| snapshot(series).map(|s| (symbol.clone(), s)))
        .collect();

    ScanSummary {
        total: report.results.len(),
        buy: count(Signal::Buy),
        sell: count(Signal::Sell),
        none: count(Signal::None),
        symbols_with_signals,
        snapshots,
    }
}

/// Latest price, volume and range, plus the percent move from the first
/// open to the last close. `None` for an empty series.
pub fn snapshot(series: &BarSeries) -> Option<SymbolSnapshot> {
    let first = series.first()?;
    let last = series.last()?;
    let change_percent = (last.close - first.open) / first.open * 100.0;
    Some(SymbolSnapshot {
        latest_price: last.close,
        volume: last.volume,
        high: last.high,
        low: last.low,
        change_percent,
        as_of: last.timestamp,
    })
}
