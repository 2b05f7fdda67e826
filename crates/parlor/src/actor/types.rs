//! # Actor Operation Types
//!
//! The message types that flow over an actor's operation channel. Every
//! externally visible interaction with an actor (RPC calls, connection
//! attach/detach, inbound channel messages, shutdown) is one of these
//! operations, and the runtime processes them strictly one at a time.

use crate::connection::{ConnectionId, ServerPayload};
use crate::errors::ActorError;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Duration;

/// Default timeout for awaiting an operation's reply (5 minutes).
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Buffer size of an actor's operation channel.
pub(crate) const OPERATION_BUFFER: usize = 64;

/// Buffer size of a connection's outbound channel.
pub(crate) const OUTBOUND_BUFFER: usize = 64;

/// An operation enqueued on an actor's serialized execution loop.
#[derive(Debug)]
pub enum ActorOperation {
    /// Invoke a method on the actor
    Call {
        /// Name of the method to invoke
        method: String,
        /// Positional arguments
        args: Vec<Value>,
        /// Channel to send the result back to the caller
        response_tx: oneshot::Sender<Result<Value, ActorError>>,
    },
    /// Register a connection and send it a snapshot of current state
    Attach {
        connection_id: ConnectionId,
        outbound_tx: mpsc::Sender<ServerPayload>,
        response_tx: oneshot::Sender<Result<(), ActorError>>,
    },
    /// Remove a connection; idempotent
    Detach { connection_id: ConnectionId },
    /// A raw inbound payload from an attached connection
    ChannelMessage {
        connection_id: ConnectionId,
        raw: String,
    },
    /// Drain and stop the operation loop
    Shutdown { response_tx: oneshot::Sender<()> },
}

/// The outcome of one actor method invocation.
///
/// `committed` marks operations that mutated and persisted state; the runtime
/// broadcasts the new snapshot to attached connections exactly when it is set.
#[derive(Debug, Clone)]
pub struct CallResult {
    pub value: Value,
    pub committed: bool,
}

impl CallResult {
    /// A read-only outcome; no broadcast follows.
    pub fn read(value: Value) -> Self {
        Self {
            value,
            committed: false,
        }
    }

    /// A committed mutation; the runtime broadcasts the new state.
    pub fn mutation(value: Value) -> Self {
        Self {
            value,
            committed: true,
        }
    }
}
