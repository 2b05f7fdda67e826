//! # Counter Actor
//!
//! One durable integer register per name, with get/increment/decrement.
//! Every operation is a serialized read-modify-write: the operation loop
//! already guarantees exclusivity, so the method bodies take no locks.

use crate::actor::{Actor, CallResult};
use crate::errors::ActorError;
use crate::store::{StoreError, StorePartition};
use async_trait::async_trait;
use serde_json::{json, Value};

const VALUE_KEY: &str = "value";

/// A durable counter. The value may go negative; amounts are applied as
/// given, with no bounds or sign validation, and arithmetic wraps at the
/// i64 limits.
#[derive(Debug)]
pub struct CounterActor {
    value: i64,
}

impl CounterActor {
    /// Parse the optional `amount` argument; absent or null means 1.
    fn amount(args: &[Value]) -> Result<i64, ActorError> {
        match args.first() {
            None | Some(Value::Null) => Ok(1),
            Some(v) => v.as_i64().ok_or_else(|| {
                ActorError::InvalidArguments(format!("amount must be an integer, got {}", v))
            }),
        }
    }

    async fn apply(&mut self, delta: i64, store: &StorePartition) -> Result<CallResult, ActorError> {
        let next = self.value.wrapping_add(delta);
        // Persist before updating the working copy; a storage failure leaves
        // the mutation uncommitted.
        store.put(VALUE_KEY, json!(next)).await?;
        self.value = next;
        Ok(CallResult::mutation(json!(next)))
    }
}

#[async_trait]
impl Actor for CounterActor {
    type Deps = ();

    fn kind() -> &'static str {
        "counter"
    }

    fn exposed() -> &'static [&'static str] {
        &["get", "increment", "decrement"]
    }

    fn welcome_message() -> &'static str {
        "Connected to Counter"
    }

    async fn load(_deps: (), store: &StorePartition) -> Result<Self, ActorError> {
        let value = match store.get(VALUE_KEY).await? {
            Some(v) => v.as_i64().ok_or_else(|| {
                ActorError::Storage(StoreError::Serialization(format!(
                    "stored counter is not an integer: {}",
                    v
                )))
            })?,
            // An absent key reads as zero.
            None => 0,
        };
        Ok(Self { value })
    }

    async fn call(
        &mut self,
        method: &str,
        args: &[Value],
        store: &StorePartition,
    ) -> Result<CallResult, ActorError> {
        match method {
            "get" => Ok(CallResult::read(json!(self.value))),
            "increment" => {
                let amount = Self::amount(args)?;
                self.apply(amount, store).await
            }
            "decrement" => {
                let amount = Self::amount(args)?;
                self.apply(amount.wrapping_neg(), store).await
            }
            other => Err(ActorError::MethodNotExposed(other.to_string())),
        }
    }

    fn snapshot(&self) -> Value {
        json!({ "value": self.value })
    }
}
