//! # Actor System
//!
//! The core of the runtime: the [`Actor`] trait that domain actors implement,
//! the per-actor operation loop that serializes everything addressed to one
//! name, and the handle callers use to reach it.

pub mod handle;
pub mod runtime;
pub mod types;

// Public re-exports
pub use handle::ActorHandle;
pub use runtime::ActorRuntime;
pub use types::ActorOperation;
pub use types::CallResult;

use crate::errors::ActorError;
use crate::store::StorePartition;
use async_trait::async_trait;
use serde_json::Value;

/// A named, independently-serialized unit of state and behavior.
///
/// Implementations hold the in-memory working copy of one partition's state.
/// The runtime guarantees that `call` is never entered concurrently for one
/// instance, so method bodies are free to read-modify-write without any
/// locking of their own. State must be persisted through the given
/// [`StorePartition`] before a mutation is considered committed: a recreated
/// instance is always rebuilt via `load`, never from memory.
#[async_trait]
pub trait Actor: Sized + Send + 'static {
    /// Shared dependencies handed to every instance of this actor kind.
    type Deps: Clone + Send + Sync + 'static;

    /// Short kind tag; prefixes the actor's store scope ("counter/default").
    fn kind() -> &'static str;

    /// The allow-list of externally invocable methods.
    ///
    /// The dispatcher consults this before an actor is even resolved; a
    /// method not listed here is unreachable from outside.
    fn exposed() -> &'static [&'static str];

    /// Human-readable text included in the welcome payload.
    fn welcome_message() -> &'static str {
        "Connected"
    }

    /// Reconstruct working state from the store.
    ///
    /// Called lazily, on the first operation after the instance is created or
    /// recreated. An error here surfaces to that operation's caller and the
    /// load is retried on the next operation.
    async fn load(deps: Self::Deps, store: &StorePartition) -> Result<Self, ActorError>;

    /// Execute one method invocation.
    ///
    /// Exactly one operation runs at a time per instance, including across
    /// await points; a suspended call still holds the actor.
    async fn call(
        &mut self,
        method: &str,
        args: &[Value],
        store: &StorePartition,
    ) -> Result<CallResult, ActorError>;

    /// The authoritative state, as broadcast to connections after a commit.
    fn snapshot(&self) -> Value;

    /// The state view carried in a welcome payload. Defaults to the full
    /// snapshot.
    fn history(&self) -> Value {
        self.snapshot()
    }
}
