//! Engine error type.

use thiserror::Error;

/// Errors reported by the engine and the optimizer built on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("insufficient data: {required} bars required, {actual} provided")]
    InsufficientData { required: usize, actual: usize },

    #[error("no signals generated: the strategy produced zero trades")]
    NoSignalsGenerated,

    #[error("insufficient activity: {trades} trades, at least {required} needed")]
    InsufficientActivity { trades: usize, required: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("bars are not strictly ascending by date at index {index}")]
    UnsortedBars { index: usize },
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
