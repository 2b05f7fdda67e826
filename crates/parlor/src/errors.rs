//! # Error Types
//!
//! Errors that can surface from actor operations. Every RPC call and channel
//! message resolves to exactly one of a value or one of these errors; an error
//! inside one serialized operation never affects other queued operations.

use crate::store::StoreError;
use thiserror::Error;

/// Errors returned to the caller of an actor operation.
#[derive(Error, Debug)]
pub enum ActorError {
    /// The persistent store failed; the operation's mutation is not committed
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// The external inference capability failed; nothing was committed
    #[error("inference failed: {0}")]
    Inference(String),

    /// The requested method is outside the actor's allow-list
    #[error("method not exposed: {0}")]
    MethodNotExposed(String),

    /// An inbound channel payload failed to parse
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// RPC arguments did not match the method's expected shape
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Communication channel to the actor was closed unexpectedly
    #[error("operation channel closed")]
    ChannelClosed,

    /// Operation exceeded the maximum allowed execution time
    #[error("operation timed out after {0} seconds")]
    OperationTimeout(u64),

    /// Actor is shutting down and cannot accept new operations
    #[error("actor is shutting down")]
    ShuttingDown,
}
