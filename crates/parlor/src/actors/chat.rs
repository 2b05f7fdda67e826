//! # Chat Actor
//!
//! An append-only conversation per name. Each user turn delegates to the
//! external inference capability and commits either both the user and
//! assistant entries or neither. The operation loop holds the actor for the
//! whole inference await, so a second `chat` call against the same name
//! queues behind the first rather than racing it: a deliberate
//! consistency-over-latency trade.

use crate::actor::{Actor, CallResult};
use crate::errors::ActorError;
use crate::inference::{ChatMessage, Inference};
use crate::store::StorePartition;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

const MESSAGES_KEY: &str = "messages";
const SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// A conversational agent with durable, strictly-appended message history.
pub struct ChatActor {
    messages: Vec<ChatMessage>,
    inference: Arc<dyn Inference>,
}

impl ChatActor {
    /// Run one chat turn: stage the user entry on a working copy, generate a
    /// reply, and commit both entries, or nothing on failure.
    async fn chat_turn(
        &mut self,
        user_message: &str,
        store: &StorePartition,
    ) -> Result<CallResult, ActorError> {
        let mut working = self.messages.clone();
        working.push(ChatMessage::user(user_message));

        let mut request = Vec::with_capacity(working.len() + 1);
        request.push(ChatMessage::system(SYSTEM_PROMPT));
        request.extend(working.iter().cloned());

        // The single suspension point of a turn. The actor stays locked for
        // its whole duration.
        let reply = self
            .inference
            .complete(&request)
            .await
            .map_err(|e| ActorError::Inference(e.to_string()))?;

        working.push(ChatMessage::assistant(reply.clone()));
        store.put_json(MESSAGES_KEY, &working).await?;
        self.messages = working;
        debug!(turns = self.messages.len(), "chat turn committed");

        Ok(CallResult::mutation(Value::String(reply)))
    }
}

#[async_trait]
impl Actor for ChatActor {
    type Deps = Arc<dyn Inference>;

    fn kind() -> &'static str {
        "chat"
    }

    fn exposed() -> &'static [&'static str] {
        &["chat"]
    }

    fn welcome_message() -> &'static str {
        "Connected to AI Chat Agent"
    }

    async fn load(inference: Arc<dyn Inference>, store: &StorePartition) -> Result<Self, ActorError> {
        let messages = match store.get(MESSAGES_KEY).await? {
            Some(v) => serde_json::from_value(v).map_err(|e| {
                ActorError::Storage(crate::store::StoreError::Serialization(e.to_string()))
            })?,
            None => Vec::new(),
        };
        Ok(Self {
            messages,
            inference,
        })
    }

    async fn call(
        &mut self,
        method: &str,
        args: &[Value],
        store: &StorePartition,
    ) -> Result<CallResult, ActorError> {
        match method {
            "chat" => {
                let user_message = args
                    .first()
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        ActorError::InvalidArguments(
                            "chat expects one string argument".to_string(),
                        )
                    })?
                    .to_string();
                self.chat_turn(&user_message, store).await
            }
            other => Err(ActorError::MethodNotExposed(other.to_string())),
        }
    }

    fn snapshot(&self) -> Value {
        json!({ "messages": self.messages })
    }

    /// The welcome payload carries the bare message list.
    fn history(&self) -> Value {
        json!(self.messages)
    }
}
