// In crates/engine/src/session.rs

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use core_types::{CancelToken, ScanReport, ScanRequest};
use tokio::sync::watch;

use crate::error::{Result, ScanError};

/// Where a scan is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanPhase {
    #[default]
    Pending,
    Fetching,
    Computing,
    Evaluating,
    Done,
    Failed,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanPhase::Pending => "pending",
            ScanPhase::Fetching => "fetching",
            ScanPhase::Computing => "computing",
            ScanPhase::Evaluating => "evaluating",
            ScanPhase::Done => "done",
            ScanPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

struct SessionState {
    in_flight: AtomicBool,
    phase: watch::Sender<ScanPhase>,
    cancel: Mutex<CancelToken>,
    request: Mutex<Option<ScanRequest>>,
    last_report: Mutex<Option<Arc<ScanReport>>>,
}

/// State shared by everyone who starts scans: the single-flight flag, the
/// running scan's cancel token, the last request and the last report.
///
/// Cloning is cheap and every clone sees the same state.
#[derive(Clone)]
pub struct ScanSession {
    state: Arc<SessionState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScanSession {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(ScanPhase::Pending);
        Self {
            state: Arc::new(SessionState {
                in_flight: AtomicBool::new(false),
                phase,
                cancel: Mutex::new(CancelToken::new()),
                request: Mutex::new(None),
                last_report: Mutex::new(None),
            }),
        }
    }

    /// A session that remembers `request` for later refreshes.
    pub fn with_request(request: ScanRequest) -> Self {
        let session = Self::new();
        session.set_request(request);
        session
    }

    /// Claims the single scan slot. The slot is released when the returned
    /// guard drops.
    pub fn try_begin(&self) -> Result<FlightGuard> {
        if self
            .state
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ScanError::AlreadyRunning);
        }

        let cancel = CancelToken::new();
        *lock(&self.state.cancel) = cancel.clone();
        self.set_phase(ScanPhase::Pending);
        Ok(FlightGuard {
            session: self.clone(),
            cancel,
        })
    }

    pub fn is_running(&self) -> bool {
        self.state.in_flight.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> ScanPhase {
        *self.state.phase.borrow()
    }

    /// Watches phase changes of every scan run in this session.
    pub fn subscribe(&self) -> watch::Receiver<ScanPhase> {
        self.state.phase.subscribe()
    }

    /// Asks the running scan, if any, to stop at its next boundary.
    pub fn cancel_current(&self) {
        if self.is_running() {
            tracing::info!(phase = %self.phase(), "Cancelling the running scan");
            lock(&self.state.cancel).cancel();
        }
    }

    /// Replaces the remembered request and cancels the running scan so the
    /// next one uses the new request.
    pub fn supersede(&self, request: ScanRequest) {
        self.set_request(request);
        self.cancel_current();
    }

    pub fn set_request(&self, request: ScanRequest) {
        *lock(&self.state.request) = Some(request);
    }

    pub fn last_request(&self) -> Option<ScanRequest> {
        lock(&self.state.request).clone()
    }

    pub fn last_report(&self) -> Option<Arc<ScanReport>> {
        lock(&self.state.last_report).clone()
    }

    pub(crate) fn store_report(&self, report: Arc<ScanReport>) {
        *lock(&self.state.last_report) = Some(report);
    }

    pub(crate) fn set_phase(&self, phase: ScanPhase) {
        self.state.phase.send_replace(phase);
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanSession")
            .field("running", &self.is_running())
            .field("phase", &self.phase())
            .finish()
    }
}

/// Proof that the holder owns the session's scan slot.
pub struct FlightGuard {
    session: ScanSession,
    cancel: CancelToken,
}

impl FlightGuard {
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn set_phase(&self, phase: ScanPhase) {
        tracing::debug!(%phase, "Scan phase");
        self.session.set_phase(phase);
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.session.state.in_flight.store(false, Ordering::Release);
    }
}
