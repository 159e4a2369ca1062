// In crates/core-types/src/scan.rs

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bar::BarSeries;
use crate::error::{Error, Result};
use crate::signal::{Signal, SignalResult};
use crate::timeframe::Timeframe;

/// Largest page the market data API will return for a single symbol.
pub const MAX_BAR_LIMIT: usize = 10_000;

/// What a caller asks the scanner to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub symbols: Vec<String>,
    #[serde(alias = "strategies")]
    pub strategy_ids: Vec<String>,
    pub timeframe: Timeframe,
    pub bar_limit: usize,
}

impl ScanRequest {
    pub fn new<S, T>(symbols: S, strategy_ids: T, timeframe: Timeframe, bar_limit: usize) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            strategy_ids: strategy_ids.into_iter().map(Into::into).collect(),
            timeframe,
            bar_limit,
        }
    }

    /// Returns a cleaned copy of the request.
    ///
    /// Symbols are trimmed and upper-cased, strategy ids trimmed, and both
    /// lists are de-duplicated keeping the first occurrence. Unknown strategy
    /// ids are not checked here; that needs the registry.
    pub fn validated(&self) -> Result<ScanRequest> {
        let symbols = dedup_preserving_order(
            self.symbols.iter().map(|s| s.trim().to_ascii_uppercase()),
        );
        if symbols.is_empty() {
            return Err(Error::InvalidRequest("no symbols given".into()));
        }

        let strategy_ids = dedup_preserving_order(self.strategy_ids.iter().map(|s| s.trim().to_string()));
        if strategy_ids.is_empty() {
            return Err(Error::InvalidRequest("no strategies selected".into()));
        }

        if self.bar_limit == 0 || self.bar_limit > MAX_BAR_LIMIT {
            return Err(Error::InvalidRequest(format!(
                "bar_limit must be between 1 and {MAX_BAR_LIMIT}, got {}",
                self.bar_limit
            )));
        }

        Ok(ScanRequest {
            symbols,
            strategy_ids,
            timeframe: self.timeframe,
            bar_limit: self.bar_limit,
        })
    }
}

fn dedup_preserving_order(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanStatus {
    Done,
    Failed,
}

/// Display figures for one symbol, taken from the tail of its series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSnapshot {
    pub latest_price: f64,
    pub volume: u64,
    pub high: f64,
    pub low: f64,
    /// Percent move from the first bar's open to the last bar's close.
    pub change_percent: f64,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total: usize,
    pub buy: usize,
    pub sell: usize,
    pub none: usize,
    pub symbols_with_signals: usize,
    pub snapshots: BTreeMap<String, SymbolSnapshot>,
}

/// The full outcome of one scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub status: ScanStatus,
    pub error: Option<String>,
    pub timeframe: Timeframe,
    pub symbols: Vec<String>,
    pub strategies: Vec<String>,
    /// Sorted by (symbol, strategy_id).
    pub results: Vec<SignalResult>,
    pub market_data: BTreeMap<String, BarSeries>,
    pub failures: BTreeMap<String, String>,
    pub summary: ScanSummary,
    pub generated_at: DateTime<Utc>,
}

impl ScanReport {
    /// A report for a scan in which no symbol could be processed.
    pub fn failed(
        request: &ScanRequest,
        error: impl Into<String>,
        failures: BTreeMap<String, String>,
    ) -> Self {
        Self {
            status: ScanStatus::Failed,
            error: Some(error.into()),
            timeframe: request.timeframe,
            symbols: request.symbols.clone(),
            strategies: request.strategy_ids.clone(),
            results: Vec::new(),
            market_data: BTreeMap::new(),
            failures,
            summary: ScanSummary::default(),
            generated_at: Utc::now(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ScanStatus::Failed
    }

    /// Results that carry a BUY or SELL.
    pub fn actionable(&self) -> impl Iterator<Item = &SignalResult> {
        self.results.iter().filter(|r| r.signal.is_actionable())
    }

    /// The JSON shape the presentation layer consumes.
    pub fn to_wire(&self) -> WireReport<'_> {
        let strategy_results = self
            .actionable()
            .map(|r| WireStrategyResult {
                symbol: &r.symbol,
                strategy: &r.strategy_id,
                signal: r.signal,
                entry_signals: vec![entry_signal_name(&r.strategy_id, r.signal)],
                diagnostics: r.diagnostics.as_deref(),
                as_of: r.as_of,
            })
            .collect();

        WireReport {
            success: !self.is_failed(),
            status: self.status,
            error: self.error.as_deref(),
            scan_time: self.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            tickers_scanned: self.symbols.len(),
            strategies_used: &self.strategies,
            timeframe: self.timeframe,
            strategy_results,
            market_data: &self.market_data,
            failures: &self.failures,
            summary: WireSummary {
                total_signals: self.summary.buy + self.summary.sell,
                buy_signals: self.summary.buy,
                sell_signals: self.summary.sell,
                symbols_with_signals: self.summary.symbols_with_signals,
            },
            snapshots: &self.summary.snapshots,
        }
    }
}

/// `Mean Reversion (RSI)` + BUY becomes `Mean_Reversion_RSI_Entry_Buy`.
pub fn entry_signal_name(strategy_id: &str, signal: Signal) -> String {
    let mut name = String::with_capacity(strategy_id.len() + 10);
    let mut pending_sep = false;
    for ch in strategy_id.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !name.is_empty() {
                name.push('_');
            }
            pending_sep = false;
            name.push(ch);
        } else {
            pending_sep = true;
        }
    }
    let side = match signal {
        Signal::Buy => "Buy",
        Signal::Sell => "Sell",
        Signal::None => "None",
    };
    format!("{name}_Entry_{side}")
}

#[derive(Debug, Serialize)]
pub struct WireReport<'a> {
    pub success: bool,
    pub status: ScanStatus,
    pub error: Option<&'a str>,
    pub scan_time: String,
    pub tickers_scanned: usize,
    pub strategies_used: &'a [String],
    pub timeframe: Timeframe,
    pub strategy_results: Vec<WireStrategyResult<'a>>,
    pub market_data: &'a BTreeMap<String, BarSeries>,
    pub failures: &'a BTreeMap<String, String>,
    pub summary: WireSummary,
    pub snapshots: &'a BTreeMap<String, SymbolSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct WireStrategyResult<'a> {
    pub symbol: &'a str,
    pub strategy: &'a str,
    pub signal: Signal,
    pub entry_signals: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<&'a str>,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct WireSummary {
    pub total_signals: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub symbols_with_signals: usize,
}

/// Result of the connectivity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub message: String,
}

impl ConnectionStatus {
    pub fn connected(message: impl Into<String>) -> Self {
        Self {
            connected: true,
            message: message.into(),
        }
    }

    pub fn disconnected(message: impl Into<String>) -> Self {
        Self {
            connected: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> ScanRequest {
        ScanRequest::new(
            [" aapl", "MSFT", "AAPL ", ""],
            ["Golden Cross", " Golden Cross", "Momentum Trading"],
            Timeframe::OneDay,
            200,
        )
    }

    #[test]
    fn validated_cleans_symbols_and_strategies() {
        let clean = request().validated().unwrap();
        assert_eq!(clean.symbols, vec!["AAPL", "MSFT"]);
        assert_eq!(clean.strategy_ids, vec!["Golden Cross", "Momentum Trading"]);
    }

    #[test]
    fn validated_rejects_empty_lists_and_bad_limits() {
        let mut req = request();
        req.symbols = vec!["   ".into()];
        assert!(matches!(req.validated(), Err(Error::InvalidRequest(_))));

        let mut req = request();
        req.strategy_ids.clear();
        assert!(req.validated().is_err());

        let mut req = request();
        req.bar_limit = 0;
        assert!(req.validated().is_err());
        req.bar_limit = MAX_BAR_LIMIT + 1;
        assert!(req.validated().is_err());
    }

    #[test]
    fn entry_signal_names_follow_column_convention() {
        assert_eq!(
            entry_signal_name("Mean Reversion (RSI)", Signal::Buy),
            "Mean_Reversion_RSI_Entry_Buy"
        );
        assert_eq!(
            entry_signal_name("Pivot Point (Intraday S/R)", Signal::Sell),
            "Pivot_Point_Intraday_S_R_Entry_Sell"
        );
    }

    #[test]
    fn wire_report_only_lists_actionable_results() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
        let req = request().validated().unwrap();
        let mut report = ScanReport::failed(&req, "unused", BTreeMap::new());
        report.status = ScanStatus::Done;
        report.error = None;
        report.results = vec![
            SignalResult::new("AAPL", "Golden Cross", Signal::Buy, at),
            SignalResult::new("AAPL", "Momentum Trading", Signal::None, at),
            SignalResult::new("MSFT", "Golden Cross", Signal::Sell, at),
        ];
        report.summary.buy = 1;
        report.summary.sell = 1;
        report.summary.none = 1;
        report.summary.total = 3;
        report.summary.symbols_with_signals = 2;

        let wire = serde_json::to_value(report.to_wire()).unwrap();
        assert_eq!(wire["success"], true);
        assert_eq!(wire["tickers_scanned"], 2);
        assert_eq!(wire["strategy_results"].as_array().unwrap().len(), 2);
        assert_eq!(wire["strategy_results"][0]["entry_signals"][0], "Golden_Cross_Entry_Buy");
        assert_eq!(wire["summary"]["total_signals"], 2);
        assert_eq!(wire["summary"]["symbols_with_signals"], 2);
    }

    #[test]
    fn failed_report_carries_annotation() {
        let req = request().validated().unwrap();
        let mut failures = BTreeMap::new();
        failures.insert("AAPL".to_string(), "timeout".to_string());
        let report = ScanReport::failed(&req, "no symbols could be fetched", failures);
        assert!(report.is_failed());
        let wire = serde_json::to_value(report.to_wire()).unwrap();
        assert_eq!(wire["success"], false);
        assert_eq!(wire["error"], "no symbols could be fetched");
        assert_eq!(wire["failures"]["AAPL"], "timeout");
    }
}
