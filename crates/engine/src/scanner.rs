// In crates/engine/src/scanner.rs

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use api_client::DataAcquisition;
use chrono::Utc;
use core_types::{
    BarSeries, CancelToken, ConnectionStatus, ScanReport, ScanRequest, ScanStatus, ScanSummary,
    SignalResult,
};
use indicators::{IndicatorSet, IndicatorSpec};
use rayon::prelude::*;
use strategies::StrategyRegistry;

use crate::error::{Result, ScanError};
use crate::session::{ScanPhase, ScanSession};

/// Runs scans: fetch every symbol, compute indicators, evaluate every
/// (symbol, strategy) pair and assemble the report.
#[derive(Clone)]
pub struct Scanner {
    registry: Arc<StrategyRegistry>,
    acquisition: DataAcquisition,
}

impl Scanner {
    pub fn new(registry: Arc<StrategyRegistry>, acquisition: DataAcquisition) -> Self {
        Self {
            registry,
            acquisition,
        }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.acquisition.status().await
    }

    /// Runs one scan in `session`.
    ///
    /// Per-symbol fetch failures are markers in the report. A scan in which no
    /// symbol could be fetched returns a FAILED report rather than an error.
    pub async fn run(&self, session: &ScanSession, request: &ScanRequest) -> Result<Arc<ScanReport>> {
        let request = request.validated()?;
        self.registry.check_ids(&request.strategy_ids)?;
        let specs = self.registry.requirements(&request.strategy_ids)?;

        let guard = session.try_begin()?;
        session.set_request(request.clone());
        let cancel = guard.cancel_token().clone();
        let started = Instant::now();
        tracing::info!(
            symbols = request.symbols.len(),
            strategies = request.strategy_ids.len(),
            timeframe = %request.timeframe,
            bar_limit = request.bar_limit,
            "Scan started"
        );

        // --- Fetching ---
        guard.set_phase(ScanPhase::Fetching);
        let fetched = self
            .acquisition
            .fetch_all(&request.symbols, request.timeframe, request.bar_limit, &cancel)
            .await;
        if cancel.is_cancelled() {
            guard.set_phase(ScanPhase::Failed);
            return Err(ScanError::Cancelled {
                phase: ScanPhase::Fetching,
            });
        }

        let failures: BTreeMap<String, String> = fetched
            .failures
            .iter()
            .map(|(symbol, err)| (symbol.clone(), err.to_string()))
            .collect();
        if fetched.series.is_empty() {
            tracing::error!(failed = failures.len(), "No symbol could be fetched");
            guard.set_phase(ScanPhase::Failed);
            let report = Arc::new(ScanReport::failed(
                &request,
                "no market data could be fetched for any symbol",
                failures,
            ));
            session.store_report(Arc::clone(&report));
            return Ok(report);
        }

        // --- Computing and evaluating ---
        guard.set_phase(ScanPhase::Computing);
        let registry = Arc::clone(&self.registry);
        let ids = request.strategy_ids.clone();
        let phase_session = session.clone();
        let blocking_cancel = cancel.clone();
        let series = fetched.series;
        let evaluated = tokio::task::spawn_blocking(move || {
            let results = evaluate_all(&registry, &series, &specs, &ids, &blocking_cancel, &phase_session)?;
            Ok::<_, ScanError>((series, results))
        })
        .await
        .map_err(|e| ScanError::Internal(format!("evaluation task failed: {e}")))
        .and_then(|outcome| outcome);
        let (series, results) = match evaluated {
            Ok(done) => done,
            Err(err) => {
                guard.set_phase(ScanPhase::Failed);
                return Err(err);
            }
        };

        if cancel.is_cancelled() {
            guard.set_phase(ScanPhase::Failed);
            return Err(ScanError::Cancelled {
                phase: ScanPhase::Evaluating,
            });
        }

        // --- Done ---
        let mut report = ScanReport {
            status: ScanStatus::Done,
            error: None,
            timeframe: request.timeframe,
            symbols: request.symbols.clone(),
            strategies: request.strategy_ids.clone(),
            results,
            market_data: series,
            failures,
            summary: ScanSummary::default(),
            generated_at: Utc::now(),
        };
        report.summary = analytics::summarize(&report);
        guard.set_phase(ScanPhase::Done);

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            results = report.results.len(),
            buy = report.summary.buy,
            sell = report.summary.sell,
            failed = report.failures.len(),
            "Scan finished"
        );
        let report = Arc::new(report);
        session.store_report(Arc::clone(&report));
        Ok(report)
    }
}

/// Computes one indicator set per symbol and evaluates every strategy on it.
/// Symbols are processed in parallel; results come back sorted by
/// (symbol, strategy_id).
fn evaluate_all(
    registry: &StrategyRegistry,
    series: &BTreeMap<String, BarSeries>,
    specs: &[IndicatorSpec],
    ids: &[String],
    cancel: &CancelToken,
    session: &ScanSession,
) -> Result<Vec<SignalResult>> {
    let entries: Vec<&BarSeries> = series.values().collect();
    let sets: Vec<IndicatorSet> = entries
        .par_iter()
        .map(|series| IndicatorSet::compute(series, specs))
        .collect();

    if cancel.is_cancelled() {
        return Err(ScanError::Cancelled {
            phase: ScanPhase::Computing,
        });
    }
    session.set_phase(ScanPhase::Evaluating);

    let mut results: Vec<SignalResult> = entries
        .par_iter()
        .zip(sets.par_iter())
        .flat_map_iter(|(series, set)| ids.iter().map(move |id| registry.evaluate(id, series, set)))
        .collect();
    results.sort_by(|a, b| {
        (a.symbol.as_str(), a.strategy_id.as_str()).cmp(&(b.symbol.as_str(), b.strategy_id.as_str()))
    });
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture_scanner, v_shape_bars, CountingProvider};
    use api_client::{AcquisitionError, FixtureProvider};
    use core_types::{Signal, Timeframe};
    use std::time::Duration;

    fn request(symbols: &[&str]) -> ScanRequest {
        ScanRequest::new(
            symbols.iter().copied(),
            ["Golden Cross", "Mean Reversion (RSI)", "Momentum Trading"],
            Timeframe::OneDay,
            400,
        )
    }

    #[tokio::test]
    async fn partial_failure_is_reported_per_symbol() {
        let provider = FixtureProvider::new()
            .with_bars("MSFT", v_shape_bars())
            .with_bars("AAPL", v_shape_bars())
            .with_failure("BAD", AcquisitionError::InvalidSymbol("BAD".into()));
        let scanner = fixture_scanner(provider);
        let session = ScanSession::new();

        let report = scanner.run(&session, &request(&["msft", "BAD", "aapl"])).await.unwrap();

        assert_eq!(report.status, ScanStatus::Done);
        assert_eq!(report.symbols, vec!["MSFT", "BAD", "AAPL"]);
        assert_eq!(report.market_data.len(), 2);
        assert!(report.failures["BAD"].contains("BAD"));
        // Two symbols times three strategies, sorted by symbol then strategy.
        assert_eq!(report.results.len(), 6);
        let keys: Vec<_> = report
            .results
            .iter()
            .map(|r| (r.symbol.as_str(), r.strategy_id.as_str()))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(report.results[0].symbol, "AAPL");

        assert_eq!(report.summary.total, 6);
        assert_eq!(
            report.summary.buy + report.summary.sell + report.summary.none,
            6
        );
        assert_eq!(report.summary.snapshots.len(), 2);
        assert_eq!(session.phase(), ScanPhase::Done);
        assert!(!session.is_running());
        assert!(Arc::ptr_eq(&session.last_report().unwrap(), &report));
    }

    #[tokio::test]
    async fn all_symbols_failing_gives_a_failed_report() {
        let provider = FixtureProvider::new();
        let scanner = fixture_scanner(provider);
        let session = ScanSession::new();

        let report = scanner.run(&session, &request(&["AAPL", "MSFT"])).await.unwrap();

        assert!(report.is_failed());
        assert!(report.error.is_some());
        assert!(report.results.is_empty());
        assert_eq!(report.failures.len(), 2);
        assert_eq!(session.phase(), ScanPhase::Failed);
        assert!(!report.to_wire().success);
    }

    #[tokio::test]
    async fn unknown_strategy_is_rejected_before_fetching() {
        let scanner = fixture_scanner(FixtureProvider::new().with_bars("AAPL", v_shape_bars()));
        let session = ScanSession::new();
        let bad = ScanRequest::new(["AAPL"], ["No Such Strategy"], Timeframe::OneDay, 200);

        let err = scanner.run(&session, &bad).await.unwrap_err();
        assert_eq!(err, ScanError::UnknownStrategy("No Such Strategy".into()));
        assert!(session.last_report().is_none());
        assert!(session.last_request().is_none());
    }

    #[tokio::test]
    async fn empty_request_is_invalid() {
        let scanner = fixture_scanner(FixtureProvider::new());
        let session = ScanSession::new();
        let empty = ScanRequest::new(Vec::<String>::new(), ["Golden Cross"], Timeframe::OneDay, 200);
        assert!(matches!(
            scanner.run(&session, &empty).await,
            Err(ScanError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn a_second_scan_is_refused_while_one_runs() {
        let scanner = fixture_scanner(FixtureProvider::new().with_bars("AAPL", v_shape_bars()));
        let session = ScanSession::new();
        let _held = session.try_begin().unwrap();

        let err = scanner.run(&session, &request(&["AAPL"])).await.unwrap_err();
        assert_eq!(err, ScanError::AlreadyRunning);
    }

    #[tokio::test]
    async fn concurrent_runs_share_one_slot() {
        let scanner = fixture_scanner(CountingProvider::new(Duration::from_millis(50)));
        let session = ScanSession::new();
        let req = request(&["AAPL"]);

        let (a, b) = tokio::join!(scanner.run(&session, &req), scanner.run(&session, &req));
        let refused = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(ScanError::AlreadyRunning)))
            .count();
        assert_eq!(refused, 1);
        assert!(a.is_ok() || b.is_ok());
    }

    #[tokio::test]
    async fn cancelling_during_fetch_stops_the_scan() {
        let scanner = fixture_scanner(CountingProvider::new(Duration::from_millis(100)));
        let session = ScanSession::new();
        let req = request(&["AAPL", "MSFT"]);

        let canceller = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            session.cancel_current();
        };
        let (outcome, ()) = tokio::join!(scanner.run(&session, &req), canceller);

        assert_eq!(
            outcome.unwrap_err(),
            ScanError::Cancelled {
                phase: ScanPhase::Fetching
            }
        );
        assert!(!session.is_running());
        assert!(session.last_report().is_none());
    }

    #[tokio::test]
    async fn reports_are_deterministic_apart_from_their_timestamp() {
        let provider = FixtureProvider::new()
            .with_bars("AAPL", v_shape_bars())
            .with_bars("MSFT", v_shape_bars());
        let scanner = fixture_scanner(provider);
        let session = ScanSession::new();
        let req = request(&["MSFT", "AAPL"]);

        let first = scanner.run(&session, &req).await.unwrap();
        let second = scanner.run(&session, &req).await.unwrap();

        let mut first = (*first).clone();
        first.generated_at = second.generated_at;
        assert_eq!(&first, second.as_ref());
    }

    #[tokio::test]
    async fn an_old_golden_cross_does_not_fire_on_the_latest_bar() {
        let scanner = fixture_scanner(FixtureProvider::new().with_bars("AAPL", v_shape_bars()));
        let session = ScanSession::new();
        let report = scanner.run(&session, &request(&["AAPL"])).await.unwrap();

        let golden = report
            .results
            .iter()
            .find(|r| r.strategy_id == "Golden Cross")
            .unwrap();
        // The averages crossed early in the recovery.
        assert_eq!(golden.signal, Signal::None);
        assert!(golden.diagnostics.is_none());
    }

    fn flat_bars(count: usize, minutes: i64) -> Vec<core_types::RawBar> {
        use chrono::TimeZone;
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap();
        (0..count)
            .map(|i| core_types::RawBar {
                timestamp: start + chrono::Duration::minutes(minutes * i as i64),
                open: 100.0,
                high: 100.0,
                low: 100.0,
                close: 100.0,
                volume: 5_000,
            })
            .collect()
    }

    #[tokio::test]
    async fn flat_prices_give_no_momentum_signal() {
        let scanner = fixture_scanner(FixtureProvider::new().with_bars("AAPL", flat_bars(60, 5)));
        let session = ScanSession::new();
        let req = ScanRequest::new(
            ["AAPL"],
            ["Momentum Trading", "MACD Bullish ADX"],
            Timeframe::FiveMinutes,
            50,
        );

        let report = scanner.run(&session, &req).await.unwrap();

        assert_eq!(report.status, ScanStatus::Done);
        assert_eq!(report.market_data["AAPL"].len(), 50);
        assert_eq!(report.results.len(), 2);
        assert!(report.results.iter().all(|r| r.signal == Signal::None));
        assert_eq!(report.summary.none, 2);
    }

    #[test]
    fn evaluation_stops_when_cancelled_after_computing() {
        let registry = StrategyRegistry::builtin().unwrap();
        let ids = vec!["Golden Cross".to_string()];
        let specs = registry.requirements(&ids).unwrap();
        let series: BTreeMap<String, BarSeries> = [(
            "AAPL".to_string(),
            core_types::normalize("AAPL", Timeframe::OneDay, v_shape_bars()).unwrap(),
        )]
        .into_iter()
        .collect();
        let session = ScanSession::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = evaluate_all(&registry, &series, &specs, &ids, &cancel, &session).unwrap_err();
        assert_eq!(
            err,
            ScanError::Cancelled {
                phase: ScanPhase::Computing
            }
        );
        assert_eq!(session.phase(), ScanPhase::Pending);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancelling_during_compute_marks_the_scan_failed() {
        let symbols: Vec<String> = (0..200).map(|i| format!("SYM{i}")).collect();
        let provider = symbols
            .iter()
            .fold(FixtureProvider::new(), |p, s| p.with_bars(s, v_shape_bars()));
        let scanner = fixture_scanner(provider);
        let ids: Vec<String> = scanner.registry().iter().map(|d| d.id.to_string()).collect();
        let req = ScanRequest::new(symbols, ids, Timeframe::OneDay, 400);
        let session = ScanSession::new();

        let mut phases = session.subscribe();
        let canceller = {
            let session = session.clone();
            tokio::spawn(async move {
                loop {
                    let phase = *phases.borrow_and_update();
                    match phase {
                        ScanPhase::Computing | ScanPhase::Evaluating => break,
                        ScanPhase::Done | ScanPhase::Failed => return,
                        ScanPhase::Pending | ScanPhase::Fetching => {}
                    }
                    if phases.changed().await.is_err() {
                        return;
                    }
                }
                session.cancel_current();
            })
        };

        let outcome = scanner.run(&session, &req).await;
        canceller.await.unwrap();

        assert!(
            matches!(outcome, Err(ScanError::Cancelled { .. })),
            "{outcome:?}"
        );
        assert_eq!(session.phase(), ScanPhase::Failed);
        assert!(!session.is_running());
        assert!(session.last_report().is_none());
    }
}
