//! # Inference Capability
//!
//! The external service that turns a conversation into a generated reply.
//! This crate only consumes it: the chat actor hands the capability an
//! ordered list of turns prefixed with one system turn and awaits a single
//! text response. Timeouts and retries are the capability's own business;
//! the actor runtime imposes none.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Appears only in inference requests, never in stored history
    System,
    User,
    Assistant,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// An external text-generation capability.
#[async_trait]
pub trait Inference: Send + Sync {
    /// Generate one reply for the given conversation.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}
