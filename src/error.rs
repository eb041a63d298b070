//! # Errors
//!
//! Typed errors for the parts of the harness that have a contract of their own:
//! the replay memory, configuration validation and the driver lifecycle.
//!
//! Everything else (games, agents, metric tracers) reports through
//! [`anyhow::Error`] and is propagated by the driver as-is.

use {
    candle_core::DType,
    thiserror::Error,
};


/// Errors raised by the [`ReplayBuffer`](crate::components::ReplayBuffer).
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Missing or malformed buffer specification.
    #[error("invalid replay memory configuration: {0}")]
    Config(String),

    /// A state tensor does not match the configured element shape.
    #[error("{buffer} shape mismatch: expected {expected:?}, got {actual:?}")]
    InvalidShape {
        buffer: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// More samples were requested than the buffer can provide.
    #[error("cannot sample {requested} distinct transitions out of {available}")]
    InsufficientData {
        requested: usize,
        available: usize,
    },

    #[error("unsupported buffer dtype {0:?}")]
    UnsupportedDType(DType),

    /// The action index does not fit the `action_ids` buffer.
    #[error("action index {0} does not fit the action buffer")]
    InvalidAction(usize),

    #[error(transparent)]
    Tensor(#[from] candle_core::Error),
}

/// A configuration value failed validation.
#[derive(Debug, Error)]
#[error("invalid configuration `{field}`: {reason}")]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: String,
}
impl ConfigError {
    pub fn new(
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors raised by the [`EpisodeDriver`](crate::engines::EpisodeDriver) itself.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("the driver has already run, create a new driver for every run")]
    AlreadyRan,

    /// The training worker did not observe the stop flag in time.
    #[error("training worker did not stop within {0:?}")]
    WorkerShutdown(std::time::Duration),

    #[error("training worker panicked")]
    WorkerPanicked,
}
