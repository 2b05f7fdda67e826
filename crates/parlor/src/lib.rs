//! # Parlor Actor Runtime
//!
//! Parlor hosts named, independently-addressable stateful actors. Each name
//! maps to one serialized execution context and one durable state partition:
//! operations addressed to the same name run strictly one at a time in
//! arrival order, even across await points, while different names run fully
//! concurrently. Actors expose an allow-listed subset of methods as RPC
//! operations and push committed state changes to any number of attached
//! real-time connections.
//!
//! ## Core pieces
//!
//! * [`Registry`]: resolves names to running instances, lazily and
//!   idempotently, and is the entry point for RPC invocation and connection
//!   attach
//! * [`Actor`]: the trait a domain actor implements, covering its allow-list,
//!   state loading, method bodies, and broadcastable snapshot
//! * [`ActorHandle`]: the caller-facing side of one instance's operation
//!   queue
//! * [`StateStore`] / [`StorePartition`]: durable per-actor key/value storage
//! * [`Connection`]: a live bidirectional channel receiving welcome, response,
//!   error, and state-broadcast payloads
//!
//! Two domain actors ship with the runtime: [`CounterActor`], a durable
//! integer register, and [`ChatActor`], a conversational agent that delegates
//! reply generation to an external [`Inference`] capability.
//!
//! ## Consistency model
//!
//! Durability is read-your-writes within one actor across restarts: every
//! committed mutation is persisted before its operation replies, and a
//! recreated instance reconstructs state from the store, never from memory.
//! Broadcast to connections is best-effort; a stale connection is dropped
//! without affecting the triggering operation or other connections.

pub mod actor;
pub mod actors;
pub mod connection;
pub mod errors;
pub mod id;
pub mod inference;
pub mod logging;
pub mod registry;
pub mod store;

pub use actor::Actor;
pub use actor::ActorHandle;
pub use actor::CallResult;
pub use actors::{ChatActor, CounterActor};
pub use connection::{ClientPayload, Connection, ConnectionId, ServerPayload};
pub use errors::ActorError;
pub use id::{ActorName, InvalidActorName};
pub use inference::{ChatMessage, Inference, Role};
pub use registry::Registry;
pub use store::{FsStore, MemoryStore, StateStore, StoreError, StorePartition};
