// In app/src/report.rs

use std::fmt::Write;

use core_types::{ScanReport, Signal};
use itertools::Itertools;
use strategies::StrategyRegistry;

/// Human-readable scan report: summary, actionable signals, then failures.
pub fn render_report(report: &ScanReport) -> String {
    let mut out = String::new();
    let wire = report.to_wire();

    let _ = writeln!(
        out,
        "Scan {} at {} | {} symbols x {} strategies | timeframe {}",
        if wire.success { "DONE" } else { "FAILED" },
        wire.scan_time,
        wire.tickers_scanned,
        wire.strategies_used.len(),
        report.timeframe,
    );
    if let Some(error) = &report.error {
        let _ = writeln!(out, "Error: {error}");
    }
    let _ = writeln!(
        out,
        "Signals: {} total, {} buy, {} sell across {} symbols",
        wire.summary.total_signals,
        wire.summary.buy_signals,
        wire.summary.sell_signals,
        wire.summary.symbols_with_signals,
    );

    // --- Signals, grouped by symbol ---
    for (symbol, results) in &report.actionable().chunk_by(|r| r.symbol.as_str()) {
        let snapshot = report.summary.snapshots.get(symbol);
        match snapshot {
            Some(s) => {
                let _ = writeln!(
                    out,
                    "\n{symbol}  {:.2} ({:+.2}%)  vol {}",
                    s.latest_price, s.change_percent, s.volume
                );
            }
            None => {
                let _ = writeln!(out, "\n{symbol}");
            }
        }
        for result in results {
            let marker = match result.signal {
                Signal::Buy => "BUY ",
                Signal::Sell => "SELL",
                Signal::None => "    ",
            };
            let _ = writeln!(out, "  {marker}  {}", result.strategy_id);
        }
    }

    if !report.failures.is_empty() {
        let _ = writeln!(out, "\nFailed symbols:");
        for (symbol, message) in &report.failures {
            let _ = writeln!(out, "  {symbol}: {message}");
        }
    }
    out
}

/// The strategy catalog grouped by category, in registration order.
pub fn render_catalog(registry: &StrategyRegistry) -> String {
    let mut out = String::new();
    for (category, definitions) in &registry.iter().chunk_by(|d| d.category) {
        let _ = writeln!(out, "{category}");
        for definition in definitions {
            let _ = writeln!(
                out,
                "  {:<45} needs {} bars",
                definition.id,
                definition.min_history()
            );
        }
    }
    out
}
