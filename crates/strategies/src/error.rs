// In crates/strategies/src/error.rs

use thiserror::Error;

/// Why a rule could not produce a verdict. Never escapes the registry: every
/// variant is folded into a NONE result with a diagnostic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("insufficient data")]
    Insufficient,

    #[error("indicator {0} was not computed")]
    MissingIndicator(String),

    #[error("{0}")]
    Failed(String),
}

impl EvalError {
    /// The diagnostic string attached to the NONE result.
    pub fn diagnostic(&self) -> String {
        match self {
            EvalError::Insufficient | EvalError::MissingIndicator(_) => "insufficient-data".into(),
            EvalError::Failed(cause) => format!("evaluation-error:{cause}"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("configuration error: strategy id {0:?} is registered twice")]
    DuplicateStrategy(String),

    #[error("unknown strategy {0:?}")]
    UnknownStrategy(String),
}
