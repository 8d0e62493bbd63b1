use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a computation's own logic.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ComputeError {
    message: String,
}

impl ComputeError {
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure of a single request, forwarded from the execution unit to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum WorkerError {
    #[error("computation `{0}` is not registered")]
    UnknownComputation(String),
    #[error("failed to decode message: {0}")]
    Decode(String),
    #[error("failed to encode message: {0}")]
    Encode(String),
    #[error("computation failed: {0}")]
    Computation(ComputeError),
    #[error("computation panicked: {0}")]
    Panicked(String),
    #[error("execution unit exited before responding")]
    UnitExited,
}

/// Errors returned synchronously by the helper's own operations.
#[derive(Debug, Error)]
pub enum OffloadError {
    #[error("a computation is already running")]
    Busy,
    #[error("helper has been closed")]
    Closed,
    #[error("failed to encode input: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to spawn execution unit")]
    Spawn(#[source] std::io::Error),
    #[error("execution unit is no longer accepting requests")]
    Disconnected,
}
