// In crates/api-client/src/acquisition.rs

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use app_config::AcquisitionSettings;
use core_types::{normalize, BarSeries, CancelToken, ConnectionStatus, Timeframe};
use futures::stream::{self, StreamExt};
use tokio::time::{sleep, timeout};

use crate::error::{AcquisitionError, Result};
use crate::provider::BarProvider;

/// Exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per symbol, including the first. Zero behaves like one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Cap on the delay, as a multiple of `base_delay`.
    pub max_delay_multiplier: u32,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1 for the first retry).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32
            .saturating_pow(retry.saturating_sub(1))
            .min(self.max_delay_multiplier.max(1));
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay_multiplier: 4,
        }
    }
}

/// Per-symbol outcome of a batch fetch.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub series: BTreeMap<String, BarSeries>,
    pub failures: BTreeMap<String, AcquisitionError>,
}

/// Fetches and normalizes bars through a [`BarProvider`] with timeouts,
/// retries and a bounded number of concurrent calls.
#[derive(Clone)]
pub struct DataAcquisition {
    provider: Arc<dyn BarProvider>,
    retry: RetryPolicy,
    request_timeout: Duration,
    concurrency: usize,
}

impl DataAcquisition {
    pub fn new(provider: Arc<dyn BarProvider>) -> Self {
        Self::from_settings(provider, &AcquisitionSettings::default())
    }

    pub fn from_settings(provider: Arc<dyn BarProvider>, settings: &AcquisitionSettings) -> Self {
        Self {
            provider,
            retry: RetryPolicy {
                max_attempts: settings.max_attempts,
                base_delay: settings.base_delay(),
                max_delay_multiplier: settings.max_delay_multiplier,
            },
            request_timeout: settings.request_timeout(),
            concurrency: settings.concurrency.max(1),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// One symbol's bars as a validated series.
    ///
    /// Cancellation is checked before every attempt and during backoff; an
    /// attempt already in flight runs to completion.
    pub async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
        cancel: &CancelToken,
    ) -> Result<BarSeries> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(AcquisitionError::Cancelled);
            }
            attempt += 1;

            let outcome = match timeout(
                self.request_timeout,
                self.provider.get_bars(symbol, timeframe, limit),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(AcquisitionError::Timeout(self.request_timeout)),
            };

            match outcome {
                Ok(raw) => {
                    let series = normalize(symbol, timeframe, raw)?;
                    if series.is_empty() {
                        return Err(AcquisitionError::NoData);
                    }
                    tracing::debug!(%symbol, bars = series.len(), attempt, "Bars acquired");
                    return Ok(series);
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(%symbol, attempt, ?delay, error = %err, "Transient acquisition failure, retrying");
                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = cancel.cancelled() => return Err(AcquisitionError::Cancelled),
                    }
                }
                Err(err) => {
                    tracing::warn!(%symbol, attempt, error = %err, "Acquisition failed");
                    return Err(err);
                }
            }
        }
    }

    /// Fetches every symbol with at most `concurrency` calls in flight.
    /// Failures are recorded per symbol and never abort the batch.
    pub async fn fetch_all(
        &self,
        symbols: &[String],
        timeframe: Timeframe,
        limit: usize,
        cancel: &CancelToken,
    ) -> FetchOutcome {
        let results: Vec<(String, Result<BarSeries>)> = stream::iter(symbols.iter().cloned())
            .map(|symbol| async move {
                let result = self.fetch(&symbol, timeframe, limit, cancel).await;
                (symbol, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut outcome = FetchOutcome::default();
        for (symbol, result) in results {
            match result {
                Ok(series) => {
                    outcome.series.insert(symbol, series);
                }
                Err(err) => {
                    outcome.failures.insert(symbol, err);
                }
            }
        }
        tracing::info!(
            provider = self.provider.name(),
            fetched = outcome.series.len(),
            failed = outcome.failures.len(),
            "Batch acquisition finished"
        );
        outcome
    }

    /// Connectivity check for status displays.
    pub async fn status(&self) -> ConnectionStatus {
        let name = self.provider.name();
        match timeout(self.request_timeout, self.provider.probe()).await {
            Ok(Ok(())) => ConnectionStatus::connected(format!("Connected to {name}")),
            Ok(Err(err)) => ConnectionStatus::disconnected(format!("{name}: {err}")),
            Err(_) => ConnectionStatus::disconnected(format!(
                "{name}: no response within {:?}",
                self.request_timeout
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use core_types::RawBar;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn raw_bars(n: usize) -> Vec<RawBar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| RawBar {
                timestamp: start + ChronoDuration::days(i as i64),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.5,
                volume: 100,
            })
            .collect()
    }

    /// Plays back a scripted sequence of outcomes per symbol and records
    /// concurrency.
    #[derive(Default)]
    struct ScriptedProvider {
        scripts: Mutex<HashMap<String, Vec<Result<Vec<RawBar>>>>>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        latency: Duration,
    }

    impl ScriptedProvider {
        fn script(self, symbol: &str, outcomes: Vec<Result<Vec<RawBar>>>) -> Self {
            self.scripts.lock().unwrap().insert(symbol.into(), outcomes);
            self
        }
    }

    #[async_trait]
    impl BarProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn get_bars(&self, symbol: &str, _: Timeframe, _: usize) -> Result<Vec<RawBar>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            sleep(self.latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(symbol) {
                Some(outcomes) if outcomes.len() > 1 => outcomes.remove(0),
                Some(outcomes) => outcomes[0].clone(),
                None => Ok(raw_bars(5)),
            }
        }

        async fn probe(&self) -> Result<()> {
            Err(AcquisitionError::Unauthorized)
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay_multiplier: 4,
        }
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let provider = ScriptedProvider::default().script(
            "AAPL",
            vec![Err(AcquisitionError::RateLimited), Err(AcquisitionError::Server(502)), Ok(raw_bars(3))],
        );
        let provider = Arc::new(provider);
        let acquisition = DataAcquisition::new(provider.clone()).with_retry(fast_retry());

        let series = acquisition
            .fetch("AAPL", Timeframe::OneDay, 3, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let provider = Arc::new(
            ScriptedProvider::default().script("ZZZZ", vec![Err(AcquisitionError::InvalidSymbol("ZZZZ".into()))]),
        );
        let acquisition = DataAcquisition::new(provider.clone()).with_retry(fast_retry());

        let err = acquisition
            .fetch("ZZZZ", Timeframe::OneDay, 3, &CancelToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, AcquisitionError::InvalidSymbol("ZZZZ".into()));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_stop_after_max_attempts() {
        let provider = Arc::new(ScriptedProvider::default().script("AAPL", vec![Err(AcquisitionError::RateLimited)]));
        let acquisition = DataAcquisition::new(provider.clone()).with_retry(fast_retry());
        let err = acquisition
            .fetch("AAPL", Timeframe::OneDay, 3, &CancelToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, AcquisitionError::RateLimited);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let provider = Arc::new(ScriptedProvider {
            latency: Duration::from_millis(200),
            ..ScriptedProvider::default()
        });
        let acquisition = DataAcquisition::new(provider)
            .with_retry(RetryPolicy {
                max_attempts: 1,
                ..fast_retry()
            })
            .with_request_timeout(Duration::from_millis(10));
        let err = acquisition
            .fetch("AAPL", Timeframe::OneDay, 3, &CancelToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, AcquisitionError::Timeout(Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn malformed_bars_fail_the_symbol() {
        let mut bars = raw_bars(3);
        bars[1].close = f64::NAN;
        let provider = Arc::new(ScriptedProvider::default().script("AAPL", vec![Ok(bars)]));
        let acquisition = DataAcquisition::new(provider);
        let err = acquisition
            .fetch("AAPL", Timeframe::OneDay, 3, &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::Malformed(_)));
    }

    #[tokio::test]
    async fn batch_records_failures_per_symbol() {
        let provider = Arc::new(
            ScriptedProvider::default().script("BAD", vec![Err(AcquisitionError::InvalidSymbol("BAD".into()))]),
        );
        let acquisition = DataAcquisition::new(provider).with_retry(fast_retry());
        let symbols: Vec<String> = ["AAPL", "BAD", "MSFT"].iter().map(|s| s.to_string()).collect();

        let outcome = acquisition
            .fetch_all(&symbols, Timeframe::OneDay, 5, &CancelToken::new())
            .await;
        assert_eq!(outcome.series.keys().collect::<Vec<_>>(), vec!["AAPL", "MSFT"]);
        assert_eq!(
            outcome.failures.get("BAD"),
            Some(&AcquisitionError::InvalidSymbol("BAD".into()))
        );
    }

    #[tokio::test]
    async fn pool_bounds_concurrent_calls() {
        let provider = Arc::new(ScriptedProvider {
            latency: Duration::from_millis(20),
            ..ScriptedProvider::default()
        });
        let acquisition = DataAcquisition::new(provider.clone()).with_concurrency(2);
        let symbols: Vec<String> = (0..8).map(|i| format!("SYM{i}")).collect();

        let outcome = acquisition
            .fetch_all(&symbols, Timeframe::OneDay, 5, &CancelToken::new())
            .await;
        assert_eq!(outcome.series.len(), 8);
        assert!(provider.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn cancelled_batches_make_no_calls() {
        let provider = Arc::new(ScriptedProvider::default());
        let acquisition = DataAcquisition::new(provider.clone());
        let cancel = CancelToken::new();
        cancel.cancel();
        let symbols = vec!["AAPL".to_string()];

        let outcome = acquisition.fetch_all(&symbols, Timeframe::OneDay, 5, &cancel).await;
        assert_eq!(outcome.failures.get("AAPL"), Some(&AcquisitionError::Cancelled));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn status_reports_connection_failures() {
        let acquisition = DataAcquisition::new(Arc::new(ScriptedProvider::default()));
        let status = acquisition.status().await;
        assert!(!status.connected);
        assert!(status.message.starts_with("scripted:"));
    }
}
