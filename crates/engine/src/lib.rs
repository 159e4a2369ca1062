// In crates/engine/src/lib.rs

//! Scan orchestration: the single-flight scan session, the scanner that
//! drives fetch, compute and evaluate, and the refresh scheduler.

pub mod error;
pub mod scanner;
pub mod scheduler;
pub mod session;

pub use error::{Result, ScanError};
pub use scanner::Scanner;
pub use scheduler::{RefreshScheduler, ScanOutcome, SchedulerHandle};
pub use session::{FlightGuard, ScanPhase, ScanSession};
