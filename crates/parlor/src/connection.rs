//! # Connections
//!
//! Live bidirectional channels between external clients and actor instances,
//! plus the wire payloads that travel over them.
//!
//! The server side tracks each attached connection as an id and an outbound
//! sender. Attach, detach, inbound messages, and broadcasts all flow through
//! the owning actor's operation loop, so the tracked set is only ever touched
//! from one task. Delivery never blocks that loop: a connection whose buffer
//! is full or whose receiver is gone is detached on the spot, and the rest of
//! the set is unaffected.

use crate::actor::types::ActorOperation;
use crate::errors::ActorError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// A unique identifier for one attached connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a new random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-to-client payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerPayload {
    /// Sent once, immediately after attach, with the actor's current state.
    Welcome { history: Value, message: String },
    /// Reply to a channel-initiated chat turn.
    Response { content: String },
    /// A failed turn or an unparseable inbound payload.
    Error { message: String },
    /// Broadcast after every committed mutation: the new authoritative state.
    State { state: Value },
}

/// Client-to-server payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientPayload {
    Chat { content: String },
}

/// The set of connections currently attached to one actor instance.
pub(crate) struct ConnectionSet {
    connections: HashMap<ConnectionId, mpsc::Sender<ServerPayload>>,
}

impl ConnectionSet {
    pub(crate) fn new() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, id: ConnectionId, outbound_tx: mpsc::Sender<ServerPayload>) {
        self.connections.insert(id, outbound_tx);
    }

    /// Remove a connection. Idempotent; removing an unknown id is a no-op.
    pub(crate) fn remove(&mut self, id: &ConnectionId) -> bool {
        self.connections.remove(id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.connections.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Deliver `payload` to every attached connection, best-effort.
    ///
    /// Delivery must not block the owning operation loop, so a connection
    /// that cannot take the payload right now, because its buffer is full or
    /// its receiver is gone, is detached instead of waited on. The failure
    /// never reaches the triggering operation.
    pub(crate) fn broadcast(&mut self, payload: &ServerPayload) {
        self.connections.retain(|id, tx| match tx.try_send(payload.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(connection = %id, "dropping unresponsive connection during broadcast");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(connection = %id, "dropping stale connection during broadcast");
                false
            }
        });
    }

    /// Deliver `payload` to one connection, detaching it on failure.
    pub(crate) fn send_to(&mut self, id: &ConnectionId, payload: ServerPayload) {
        let Some(tx) = self.connections.get(id) else {
            debug!(connection = %id, "send to unknown connection dropped");
            return;
        };
        if let Err(e) = tx.try_send(payload) {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "unresponsive",
                mpsc::error::TrySendError::Closed(_) => "stale",
            };
            debug!(connection = %id, reason, "dropping connection on send");
            self.connections.remove(id);
        }
    }
}

/// The client half of an attached connection.
///
/// Returned by [`Registry::attach`](crate::registry::Registry::attach).
/// `recv` yields payloads pushed by the actor (starting with the welcome
/// snapshot); `send_raw`/`chat` feed inbound messages through the actor's
/// serialized operation loop. Closing is explicit and idempotent; a dropped
/// `Connection` is detached lazily the next time the actor tries to deliver
/// to it.
pub struct Connection {
    id: ConnectionId,
    operation_tx: mpsc::Sender<ActorOperation>,
    outbound_rx: mpsc::Receiver<ServerPayload>,
}

impl Connection {
    pub(crate) fn new(
        id: ConnectionId,
        operation_tx: mpsc::Sender<ActorOperation>,
        outbound_rx: mpsc::Receiver<ServerPayload>,
    ) -> Self {
        Self {
            id,
            operation_tx,
            outbound_rx,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Receive the next payload pushed by the actor.
    pub async fn recv(&mut self) -> Option<ServerPayload> {
        self.outbound_rx.recv().await
    }

    /// Receive a payload if one is already queued.
    pub fn try_recv(&mut self) -> Option<ServerPayload> {
        self.outbound_rx.try_recv().ok()
    }

    /// Send a raw inbound message, exactly as a remote client would.
    pub async fn send_raw(&self, raw: impl Into<String>) -> Result<(), ActorError> {
        self.operation_tx
            .send(ActorOperation::ChannelMessage {
                connection_id: self.id,
                raw: raw.into(),
            })
            .await
            .map_err(|_| ActorError::ChannelClosed)
    }

    /// Send a `{"type":"chat"}` payload.
    pub async fn chat(&self, content: &str) -> Result<(), ActorError> {
        let payload = ClientPayload::Chat {
            content: content.to_string(),
        };
        let raw = serde_json::to_string(&payload)
            .map_err(|e| ActorError::MalformedMessage(e.to_string()))?;
        self.send_raw(raw).await
    }

    /// Detach from the actor. Safe to call more than once.
    pub async fn close(&self) {
        let _ = self
            .operation_tx
            .send(ActorOperation::Detach {
                connection_id: self.id,
            })
            .await;
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").field("id", &self.id).finish()
    }
}
