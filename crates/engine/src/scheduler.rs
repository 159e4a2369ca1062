// In crates/engine/src/scheduler.rs

use std::sync::Arc;
use std::time::Duration;

use core_types::{CancelToken, ScanReport};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::{Result, ScanError};
use crate::scanner::Scanner;
use crate::session::ScanSession;

/// What one scheduled scan produced.
pub type ScanOutcome = Result<Arc<ScanReport>>;

const OUTCOME_BUFFER: usize = 16;
/// Shortest refresh period the loop accepts.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Re-runs the session's last request on a fixed interval.
pub struct RefreshScheduler;

impl RefreshScheduler {
    /// Starts the refresh loop. The first scan starts immediately.
    ///
    /// A tick or trigger that arrives while a scan is in flight is skipped,
    /// never queued. Outcomes arrive on the returned receiver. Intervals
    /// shorter than a millisecond are raised to one.
    pub fn spawn(
        scanner: Arc<Scanner>,
        session: ScanSession,
        interval: Duration,
    ) -> (SchedulerHandle, mpsc::Receiver<ScanOutcome>) {
        if interval < MIN_INTERVAL {
            tracing::warn!(?interval, min = ?MIN_INTERVAL, "Refresh interval too short, raising it");
        }
        let interval = interval.max(MIN_INTERVAL);
        let (outcome_tx, outcome_rx) = mpsc::channel(OUTCOME_BUFFER);
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let stop = CancelToken::new();

        let task = tokio::spawn(refresh_loop(
            scanner,
            session.clone(),
            interval,
            stop.clone(),
            trigger_rx,
            outcome_tx,
        ));

        let handle = SchedulerHandle {
            stop,
            trigger: trigger_tx,
            session,
            task,
        };
        (handle, outcome_rx)
    }
}

async fn refresh_loop(
    scanner: Arc<Scanner>,
    session: ScanSession,
    interval: Duration,
    stop: CancelToken,
    mut trigger: mpsc::Receiver<()>,
    outcomes: mpsc::Sender<ScanOutcome>,
) {
    tracing::info!(interval_secs = interval.as_secs_f64(), "Refresh scheduler started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let source = tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => "tick",
            Some(()) = trigger.recv() => "trigger",
        };
        start_scan(&scanner, &session, &outcomes, source);
    }

    session.cancel_current();
    tracing::info!("Refresh scheduler stopped");
}

fn start_scan(
    scanner: &Arc<Scanner>,
    session: &ScanSession,
    outcomes: &mpsc::Sender<ScanOutcome>,
    source: &'static str,
) {
    if session.is_running() {
        tracing::info!(source, phase = %session.phase(), "Scan still in flight, skipping refresh");
        return;
    }
    let Some(request) = session.last_request() else {
        tracing::warn!(source, "No scan request to refresh");
        return;
    };

    tracing::debug!(source, "Starting scheduled scan");
    let scanner = Arc::clone(scanner);
    let session = session.clone();
    let outcomes = outcomes.clone();
    tokio::spawn(async move {
        let outcome = scanner.run(&session, &request).await;
        if let Err(ScanError::AlreadyRunning) = outcome {
            tracing::info!(source, "Scan started elsewhere, skipping refresh");
            return;
        }
        if let Err(err) = &outcome {
            tracing::warn!(source, error = %err, "Scheduled scan ended without a report");
        }
        // The receiver going away just means nobody is listening any more.
        let _ = outcomes.send(outcome).await;
    });
}

/// Controls a running [`RefreshScheduler`].
pub struct SchedulerHandle {
    stop: CancelToken,
    trigger: mpsc::Sender<()>,
    session: ScanSession,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Requests an immediate refresh. Ignored if one is already pending.
    pub fn trigger(&self) {
        if self.trigger.try_send(()).is_err() {
            tracing::debug!("Refresh already requested");
        }
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    /// Stops the loop and cancels the in-flight scan, if any.
    pub async fn stop(self) {
        self.stop.cancel();
        self.session.cancel_current();
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "Refresh loop panicked");
        }
    }
}
