//! # Actor Handle
//!
//! The caller-facing interface to a running actor instance. A handle is cheap
//! to clone; every interaction it offers is enqueued on the actor's operation
//! channel and processed in arrival order, so the handle is also where the
//! serialization contract is entered.

use crate::actor::types::{ActorOperation, DEFAULT_OPERATION_TIMEOUT, OUTBOUND_BUFFER};
use crate::connection::{Connection, ConnectionId};
use crate::errors::ActorError;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::error;

/// A handle to a resident actor instance.
#[derive(Clone, Debug)]
pub struct ActorHandle {
    operation_tx: mpsc::Sender<ActorOperation>,
}

impl ActorHandle {
    pub(crate) fn new(operation_tx: mpsc::Sender<ActorOperation>) -> Self {
        Self { operation_tx }
    }

    /// Whether two handles address the same running instance.
    pub(crate) fn same_instance(&self, other: &ActorHandle) -> bool {
        self.operation_tx.same_channel(&other.operation_tx)
    }

    /// Invoke a method on the actor and await its result.
    ///
    /// The call queues behind any operations accepted earlier for the same
    /// actor and returns exactly one of the method's return value or an
    /// error; the two are never merged.
    pub async fn call(
        &self,
        method: impl Into<String>,
        args: Vec<Value>,
    ) -> Result<Value, ActorError> {
        let method = method.into();
        let (tx, rx) = oneshot::channel();

        self.operation_tx
            .send(ActorOperation::Call {
                method: method.clone(),
                args,
                response_tx: tx,
            })
            .await
            .map_err(|e| {
                error!("Failed to send operation: {}", e);
                ActorError::ChannelClosed
            })?;

        match timeout(DEFAULT_OPERATION_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!("Channel closed while waiting for '{}' response: {:?}", method, e);
                Err(ActorError::ChannelClosed)
            }
            Err(_) => {
                error!(
                    "Operation '{}' timed out after {:?}",
                    method, DEFAULT_OPERATION_TIMEOUT
                );
                Err(ActorError::OperationTimeout(
                    DEFAULT_OPERATION_TIMEOUT.as_secs(),
                ))
            }
        }
    }

    /// Attach a new live connection to the actor.
    ///
    /// By the time this resolves, the welcome payload carrying the actor's
    /// current state is already queued on the returned connection.
    pub async fn attach(&self) -> Result<Connection, ActorError> {
        let connection_id = ConnectionId::generate();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let (tx, rx) = oneshot::channel();

        self.operation_tx
            .send(ActorOperation::Attach {
                connection_id,
                outbound_tx,
                response_tx: tx,
            })
            .await
            .map_err(|e| {
                error!("Failed to send attach operation: {}", e);
                ActorError::ChannelClosed
            })?;

        match timeout(DEFAULT_OPERATION_TIMEOUT, rx).await {
            Ok(Ok(result)) => result.map(|_| {
                Connection::new(connection_id, self.operation_tx.clone(), outbound_rx)
            }),
            Ok(Err(e)) => {
                error!("Channel closed while waiting for attach response: {:?}", e);
                Err(ActorError::ChannelClosed)
            }
            Err(_) => {
                error!(
                    "Attach timed out after {:?}",
                    DEFAULT_OPERATION_TIMEOUT
                );
                Err(ActorError::OperationTimeout(
                    DEFAULT_OPERATION_TIMEOUT.as_secs(),
                ))
            }
        }
    }

    /// Initiate an orderly shutdown of the actor.
    ///
    /// Operations already accepted run to completion first; the loop stops
    /// once the shutdown request is reached in queue order.
    pub async fn shutdown(&self) -> Result<(), ActorError> {
        let (tx, rx) = oneshot::channel();

        self.operation_tx
            .send(ActorOperation::Shutdown { response_tx: tx })
            .await
            .map_err(|e| {
                error!("Failed to send shutdown operation: {}", e);
                ActorError::ChannelClosed
            })?;

        match timeout(DEFAULT_OPERATION_TIMEOUT, rx).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(ActorError::ChannelClosed),
            Err(_) => Err(ActorError::OperationTimeout(
                DEFAULT_OPERATION_TIMEOUT.as_secs(),
            )),
        }
    }
}
