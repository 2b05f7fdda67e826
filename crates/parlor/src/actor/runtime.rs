//! # Actor Runtime
//!
//! The per-actor operation loop. One tokio task owns the actor instance and
//! its attached connections, drains the operation channel, and executes each
//! operation to completion, including every await point, before taking the
//! next. That single loop is the serialization guarantee: no two operations
//! against the same name ever observe or mutate state concurrently, while
//! actors with different names run on independent tasks with no shared lock.

use crate::actor::handle::ActorHandle;
use crate::actor::types::{ActorOperation, CallResult, OPERATION_BUFFER};
use crate::actor::Actor;
use crate::connection::{ClientPayload, ConnectionId, ConnectionSet, ServerPayload};
use crate::errors::ActorError;
use crate::id::ActorName;
use crate::store::StorePartition;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Hosts one actor instance and serializes every operation addressed to it.
pub struct ActorRuntime<A: Actor> {
    name: ActorName,
    deps: A::Deps,
    store: StorePartition,
    /// Loaded lazily on the first operation; `None` again only if a load
    /// failed, in which case the next operation retries.
    actor: Option<A>,
    connections: ConnectionSet,
    operation_rx: mpsc::Receiver<ActorOperation>,
}

impl<A: Actor> ActorRuntime<A> {
    /// Spawn the operation loop for `name` and return a handle to it.
    ///
    /// Construction never fails; reconstructing state from the store is
    /// deferred to the first operation executed against the instance.
    pub fn spawn(name: ActorName, deps: A::Deps, store: StorePartition) -> ActorHandle {
        let (operation_tx, operation_rx) = mpsc::channel(OPERATION_BUFFER);
        let runtime = Self {
            name: name.clone(),
            deps,
            store,
            actor: None,
            connections: ConnectionSet::new(),
            operation_rx,
        };

        tokio::spawn(async move {
            debug!(actor = %name, kind = A::kind(), "actor runtime started");
            runtime.run().await;
            debug!(actor = %name, kind = A::kind(), "actor runtime stopped");
        });

        ActorHandle::new(operation_tx)
    }

    async fn run(mut self) {
        while let Some(op) = self.operation_rx.recv().await {
            match op {
                ActorOperation::Call {
                    method,
                    args,
                    response_tx,
                } => {
                    self.process_call(method, args, response_tx).await;
                }
                ActorOperation::Attach {
                    connection_id,
                    outbound_tx,
                    response_tx,
                } => {
                    self.process_attach(connection_id, outbound_tx, response_tx)
                        .await;
                }
                ActorOperation::Detach { connection_id } => {
                    if self.connections.remove(&connection_id) {
                        debug!(actor = %self.name, connection = %connection_id, "connection detached");
                    }
                }
                ActorOperation::ChannelMessage { connection_id, raw } => {
                    self.process_channel_message(connection_id, raw).await;
                }
                ActorOperation::Shutdown { response_tx } => {
                    info!(actor = %self.name, "actor shutting down");
                    self.drain_after_shutdown().await;
                    let _ = response_tx.send(());
                    return;
                }
            }
        }
    }

    /// Reject operations still queued behind a shutdown request.
    async fn drain_after_shutdown(&mut self) {
        self.operation_rx.close();
        while let Some(op) = self.operation_rx.recv().await {
            match op {
                ActorOperation::Call { response_tx, .. } => {
                    let _ = response_tx.send(Err(ActorError::ShuttingDown));
                }
                ActorOperation::Attach { response_tx, .. } => {
                    let _ = response_tx.send(Err(ActorError::ShuttingDown));
                }
                ActorOperation::Shutdown { response_tx } => {
                    let _ = response_tx.send(());
                }
                ActorOperation::Detach { .. } | ActorOperation::ChannelMessage { .. } => {}
            }
        }
    }

    async fn process_call(
        &mut self,
        method: String,
        args: Vec<Value>,
        response_tx: oneshot::Sender<Result<Value, ActorError>>,
    ) {
        debug!(actor = %self.name, method, "processing call");
        match self.execute(&method, &args).await {
            Ok(outcome) => {
                if outcome.committed {
                    self.broadcast_state();
                }
                if response_tx.send(Ok(outcome.value)).is_err() {
                    debug!(actor = %self.name, method, "caller went away before the reply");
                }
            }
            Err(e) => {
                warn!(actor = %self.name, method, error = %e, "call failed");
                if let Err(send_err) = response_tx.send(Err(e)) {
                    debug!(
                        actor = %self.name,
                        method,
                        "failed to deliver error reply: {:?}", send_err
                    );
                }
            }
        }
    }

    async fn process_attach(
        &mut self,
        connection_id: ConnectionId,
        outbound_tx: mpsc::Sender<ServerPayload>,
        response_tx: oneshot::Sender<Result<(), ActorError>>,
    ) {
        let history = match self.ensure_loaded().await {
            Ok(actor) => actor.history(),
            Err(e) => {
                warn!(actor = %self.name, error = %e, "attach failed to load state");
                let _ = response_tx.send(Err(e));
                return;
            }
        };

        let welcome = ServerPayload::Welcome {
            history,
            message: A::welcome_message().to_string(),
        };
        if outbound_tx.send(welcome).await.is_err() {
            debug!(actor = %self.name, connection = %connection_id, "connection gone before welcome");
            let _ = response_tx.send(Err(ActorError::ChannelClosed));
            return;
        }

        self.connections.insert(connection_id, outbound_tx);
        debug!(
            actor = %self.name,
            connection = %connection_id,
            attached = self.connections.len(),
            "connection attached"
        );
        let _ = response_tx.send(Ok(()));
    }

    /// Handle a raw inbound payload from one attached connection.
    ///
    /// A `chat` payload runs the same method body as the RPC path, with
    /// identical commit semantics; only the result's route differs: the reply
    /// goes back on the originating connection instead of an RPC response,
    /// after the state broadcast every attached connection gets.
    async fn process_channel_message(&mut self, connection_id: ConnectionId, raw: String) {
        let payload = match serde_json::from_str::<ClientPayload>(&raw) {
            Ok(payload) => payload,
            Err(e) => {
                let err = ActorError::MalformedMessage(e.to_string());
                debug!(actor = %self.name, connection = %connection_id, error = %err, "unparseable channel payload");
                self.connections.send_to(
                    &connection_id,
                    ServerPayload::Error {
                        message: err.to_string(),
                    },
                );
                return;
            }
        };

        match payload {
            ClientPayload::Chat { content } => {
                match self.execute("chat", &[Value::String(content)]).await {
                    Ok(outcome) => {
                        if outcome.committed {
                            self.broadcast_state();
                        }
                        let content = match outcome.value {
                            Value::String(s) => s,
                            other => other.to_string(),
                        };
                        self.connections
                            .send_to(&connection_id, ServerPayload::Response { content });
                    }
                    Err(e) => {
                        warn!(actor = %self.name, connection = %connection_id, error = %e, "channel chat failed");
                        self.connections.send_to(
                            &connection_id,
                            ServerPayload::Error {
                                message: e.to_string(),
                            },
                        );
                    }
                }
            }
        }
    }

    /// Run one method body against the loaded actor.
    async fn execute(&mut self, method: &str, args: &[Value]) -> Result<CallResult, ActorError> {
        if self.actor.is_none() {
            let actor = A::load(self.deps.clone(), &self.store).await?;
            self.actor = Some(actor);
        }
        match self.actor.as_mut() {
            Some(actor) => actor.call(method, args, &self.store).await,
            // Unreachable: the load above either populated the slot or
            // returned early.
            None => Err(ActorError::ShuttingDown),
        }
    }

    async fn ensure_loaded(&mut self) -> Result<&A, ActorError> {
        if self.actor.is_none() {
            let actor = A::load(self.deps.clone(), &self.store).await?;
            self.actor = Some(actor);
        }
        match self.actor.as_ref() {
            Some(actor) => Ok(actor),
            None => Err(ActorError::ShuttingDown),
        }
    }

    /// Push the committed state to every attached connection.
    fn broadcast_state(&mut self) {
        let Some(actor) = self.actor.as_ref() else {
            return;
        };
        if self.connections.is_empty() {
            return;
        }
        let payload = ServerPayload::State {
            state: actor.snapshot(),
        };
        self.connections.broadcast(&payload);
    }
}

impl<A: Actor> std::fmt::Debug for ActorRuntime<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorRuntime")
            .field("name", &self.name)
            .field("kind", &A::kind())
            .field("loaded", &self.actor.is_some())
            .field("connections", &self.connections.len())
            .finish()
    }
}
