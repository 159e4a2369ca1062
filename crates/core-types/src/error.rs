// In crates/core-types/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("malformed data for {symbol} at bar {index}: {reason}")]
    MalformedData {
        symbol: String,
        index: usize,
        reason: String,
    },

    #[error("invalid scan request: {0}")]
    InvalidRequest(String),

    #[error("unknown timeframe: {0}")]
    UnknownTimeframe(String),
}

pub type Result<T> = std::result::Result<T, Error>;
