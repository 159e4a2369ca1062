// In crates/engine/src/error.rs

use strategies::RegistryError;
use thiserror::Error;

use crate::session::ScanPhase;

/// Why a scan produced no report. Per-symbol and per-strategy problems never
/// end up here; they are data inside the report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("invalid scan request: {0}")]
    InvalidRequest(String),

    #[error("unknown strategy {0:?}")]
    UnknownStrategy(String),

    #[error("a scan is already in progress")]
    AlreadyRunning,

    #[error("scan cancelled during {phase}")]
    Cancelled { phase: ScanPhase },

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<core_types::Error> for ScanError {
    fn from(err: core_types::Error) -> Self {
        ScanError::InvalidRequest(err.to_string())
    }
}

impl From<RegistryError> for ScanError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownStrategy(id) => ScanError::UnknownStrategy(id),
            other => ScanError::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
