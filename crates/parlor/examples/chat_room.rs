//! Minimal end-to-end run: a chat actor with a canned inference capability,
//! one RPC turn and one channel turn, observed over a live connection.
//!
//! ```bash
//! cargo run --example chat_room
//! ```

use anyhow::Result;
use async_trait::async_trait;
use parlor::{ActorName, ChatActor, ChatMessage, Inference, MemoryStore, Registry, StateStore};
use serde_json::json;
use std::sync::Arc;

struct CannedInference;

#[async_trait]
impl Inference for CannedInference {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        Ok(format!("You said: {}", last))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    parlor::logging::init(Some("parlor=debug"))?;

    let backend: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
    let inference: Arc<dyn Inference> = Arc::new(CannedInference);
    let registry: Registry<ChatActor> = Registry::new(backend, inference);
    let room: ActorName = "lobby".parse()?;

    let mut conn = registry.attach(&room).await?;
    println!("<- {:?}", conn.recv().await);

    let reply = registry.invoke(&room, "chat", vec![json!("hello there")]).await?;
    println!("rpc reply: {}", reply);
    println!("<- {:?}", conn.recv().await);

    conn.chat("and again, over the channel").await?;
    println!("<- {:?}", conn.recv().await);
    println!("<- {:?}", conn.recv().await);

    registry.shutdown().await;
    Ok(())
}
