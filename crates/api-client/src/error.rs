// In crates/api-client/src/error.rs

use std::time::Duration;

use thiserror::Error;

/// Why bars for one symbol could not be acquired.
///
/// Transient errors are retried; permanent ones are reported for the symbol
/// straight away.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    // --- Transient ---
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by the data provider")]
    RateLimited,

    #[error("data provider server error (HTTP {0})")]
    Server(u16),

    // --- Permanent ---
    #[error("data provider rejected the API credentials")]
    Unauthorized,

    #[error("invalid symbol {0:?}")]
    InvalidSymbol(String),

    #[error("no bars returned")]
    NoData,

    #[error("malformed data: {0}")]
    Malformed(String),

    #[error("data provider error: {0}")]
    Provider(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("acquisition cancelled")]
    Cancelled,
}

impl AcquisitionError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AcquisitionError::Timeout(_)
                | AcquisitionError::Network(_)
                | AcquisitionError::RateLimited
                | AcquisitionError::Server(_)
        )
    }
}

impl From<reqwest::Error> for AcquisitionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AcquisitionError::Malformed(err.to_string())
        } else {
            AcquisitionError::Network(err.to_string())
        }
    }
}

impl From<core_types::Error> for AcquisitionError {
    fn from(err: core_types::Error) -> Self {
        AcquisitionError::Malformed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AcquisitionError>;
