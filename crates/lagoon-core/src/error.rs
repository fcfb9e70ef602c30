//! Error types for the chat core.

use crate::engine::GenerateError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced by the streaming turn pipeline.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The request carried no usable message list. Reported before any
    /// store access.
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    /// The transcript could not be durably committed. The user-visible
    /// answer was already delivered when this is raised.
    #[error("store write failure: {0}")]
    Store(#[from] StoreError),
    /// The external inference capability errored or timed out.
    #[error("inference failure: {0}")]
    Inference(#[from] GenerateError),
    /// The spawned turn task was cancelled or panicked.
    #[error("turn task failed: {0}")]
    TurnTask(String),
}
