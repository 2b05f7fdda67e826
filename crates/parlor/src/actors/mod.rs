//! # Domain Actors
//!
//! The two actor kinds built on the runtime: a durable counter and a
//! conversational chat agent.

pub mod chat;
pub mod counter;

pub use chat::ChatActor;
pub use counter::CounterActor;
