use async_trait::async_trait;
use parlor::{
    ActorError, ActorName, ChatActor, ChatMessage, FsStore, Inference, MemoryStore, Registry,
    Role, ServerPayload, StateStore,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

/// Inference double that replays a scripted sequence of outcomes and records
/// every request it receives.
struct ScriptedInference {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    delay: Duration,
}

impl ScriptedInference {
    fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
        Self::with_delay(replies, Duration::ZERO)
    }

    fn with_delay(replies: Vec<Result<&str, &str>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
            delay,
        })
    }

    fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Inference for ScriptedInference {
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("no scripted reply left")),
        }
    }
}

fn name(s: &str) -> ActorName {
    s.parse().unwrap()
}

fn registry(inference: Arc<ScriptedInference>) -> Registry<ChatActor> {
    let backend: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
    Registry::new(backend, inference as Arc<dyn Inference>)
}

fn history_of(payload: ServerPayload) -> Vec<ChatMessage> {
    match payload {
        ServerPayload::Welcome { history, .. } => serde_json::from_value(history).unwrap(),
        other => panic!("expected welcome, got {:?}", other),
    }
}

fn turn(role: Role, content: &str) -> ChatMessage {
    ChatMessage {
        role,
        content: content.to_string(),
    }
}

#[tokio::test]
async fn test_chat_appends_user_and_assistant() {
    let inference = ScriptedInference::new(vec![Ok("hello")]);
    let registry = registry(inference.clone());
    let room = name("room");

    let reply = registry
        .invoke(&room, "chat", vec![json!("hi")])
        .await
        .unwrap();
    assert_eq!(reply, json!("hello"));

    // The committed history is exactly user turn then assistant turn.
    let mut conn = registry.attach(&room).await.unwrap();
    let history = history_of(conn.recv().await.unwrap());
    assert_eq!(
        history,
        vec![turn(Role::User, "hi"), turn(Role::Assistant, "hello")]
    );

    // The inference request was the working copy prefixed with the system turn.
    let requests = inference.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0][0].role, Role::System);
    assert_eq!(requests[0][1], turn(Role::User, "hi"));
}

#[tokio::test]
async fn test_failed_turn_commits_nothing() {
    let inference = ScriptedInference::new(vec![Err("model unavailable"), Ok("recovered")]);
    let registry = registry(inference);
    let room = name("room");

    // Observe broadcasts from before the failing call.
    let mut watcher = registry.attach(&room).await.unwrap();
    let welcome = history_of(watcher.recv().await.unwrap());
    assert_eq!(welcome, vec![]);

    let err = registry
        .invoke(&room, "chat", vec![json!("x")])
        .await
        .unwrap_err();
    match &err {
        ActorError::Inference(message) => assert!(message.contains("model unavailable")),
        other => panic!("expected inference error, got {:?}", other),
    }

    // No broadcast was emitted for the failed turn.
    assert_eq!(watcher.try_recv(), None);

    // The user message was not committed either: the next turn's request
    // starts from an empty history.
    let reply = registry
        .invoke(&room, "chat", vec![json!("again")])
        .await
        .unwrap();
    assert_eq!(reply, json!("recovered"));
    let state = watcher.recv().await.unwrap();
    assert_eq!(
        state,
        ServerPayload::State {
            state: json!({ "messages": [
                { "role": "user", "content": "again" },
                { "role": "assistant", "content": "recovered" },
            ]})
        }
    );
}

#[tokio::test]
async fn test_welcome_carries_current_history() {
    let inference = ScriptedInference::new(vec![Ok("hello")]);
    let registry = registry(inference);
    let room = name("room");

    let mut early = registry.attach(&room).await.unwrap();
    assert_eq!(
        early.recv().await.unwrap(),
        ServerPayload::Welcome {
            history: json!([]),
            message: "Connected to AI Chat Agent".to_string(),
        }
    );

    registry.invoke(&room, "chat", vec![json!("hi")]).await.unwrap();

    let mut late = registry.attach(&room).await.unwrap();
    let history = history_of(late.recv().await.unwrap());
    assert_eq!(
        history,
        vec![turn(Role::User, "hi"), turn(Role::Assistant, "hello")]
    );
}

#[tokio::test]
async fn test_broadcast_reaches_connections_attached_at_commit() {
    let inference = ScriptedInference::new(vec![Ok("hello")]);
    let registry = registry(inference);
    let room = name("room");

    let mut staying = registry.attach(&room).await.unwrap();
    let mut leaving = registry.attach(&room).await.unwrap();
    staying.recv().await.unwrap();
    leaving.recv().await.unwrap();

    // Detach before the turn commits; close is awaited, so the detach is
    // queued ahead of the chat call.
    leaving.close().await;

    let reply = registry
        .invoke(&room, "chat", vec![json!("hi")])
        .await
        .unwrap();
    assert_eq!(reply, json!("hello"));

    let expected = ServerPayload::State {
        state: json!({ "messages": [
            { "role": "user", "content": "hi" },
            { "role": "assistant", "content": "hello" },
        ]}),
    };
    assert_eq!(staying.recv().await.unwrap(), expected);
    assert_eq!(leaving.try_recv(), None);
}

#[tokio::test]
async fn test_channel_chat_matches_rpc_semantics() {
    let inference = ScriptedInference::new(vec![Ok("hello")]);
    let registry = registry(inference);
    let room = name("room");

    let mut conn = registry.attach(&room).await.unwrap();
    conn.recv().await.unwrap();

    conn.chat("hi").await.unwrap();

    // The originating connection sees the state broadcast, then its reply.
    assert_eq!(
        conn.recv().await.unwrap(),
        ServerPayload::State {
            state: json!({ "messages": [
                { "role": "user", "content": "hi" },
                { "role": "assistant", "content": "hello" },
            ]}),
        }
    );
    assert_eq!(
        conn.recv().await.unwrap(),
        ServerPayload::Response {
            content: "hello".to_string(),
        }
    );
}

#[tokio::test]
async fn test_channel_failure_answers_originator_only() {
    let inference = ScriptedInference::new(vec![Err("model unavailable")]);
    let registry = registry(inference);
    let room = name("room");

    let mut origin = registry.attach(&room).await.unwrap();
    let mut other = registry.attach(&room).await.unwrap();
    origin.recv().await.unwrap();
    other.recv().await.unwrap();

    origin.chat("x").await.unwrap();

    match origin.recv().await.unwrap() {
        ServerPayload::Error { message } => assert!(message.contains("model unavailable")),
        payload => panic!("expected error payload, got {:?}", payload),
    }
    assert_eq!(other.try_recv(), None);
}

#[tokio::test]
async fn test_malformed_payload_reported_on_same_connection() {
    let inference = ScriptedInference::new(vec![]);
    let registry = registry(inference);
    let room = name("room");

    let mut conn = registry.attach(&room).await.unwrap();
    let mut other = registry.attach(&room).await.unwrap();
    conn.recv().await.unwrap();
    other.recv().await.unwrap();

    conn.send_raw("{not json").await.unwrap();
    match conn.recv().await.unwrap() {
        ServerPayload::Error { message } => assert!(message.contains("malformed message")),
        payload => panic!("expected error payload, got {:?}", payload),
    }

    // An unknown message type is malformed too.
    conn.send_raw("{\"type\":\"dance\"}").await.unwrap();
    assert!(matches!(
        conn.recv().await.unwrap(),
        ServerPayload::Error { .. }
    ));

    // Other connections and actor state are unaffected.
    assert_eq!(other.try_recv(), None);
}

#[tokio::test]
async fn test_concurrent_chats_never_interleave() {
    let inference = ScriptedInference::with_delay(
        vec![Ok("first reply"), Ok("second reply")],
        Duration::from_millis(100),
    );
    let registry = registry(inference.clone());
    let room = name("room");

    let first = {
        let registry = registry.clone();
        let room = room.clone();
        tokio::spawn(async move { registry.invoke(&room, "chat", vec![json!("first")]).await })
    };
    // Let the first call reach the actor before enqueueing the second.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let second = {
        let registry = registry.clone();
        let room = room.clone();
        tokio::spawn(async move { registry.invoke(&room, "chat", vec![json!("second")]).await })
    };

    assert_eq!(first.await.unwrap().unwrap(), json!("first reply"));
    assert_eq!(second.await.unwrap().unwrap(), json!("second reply"));

    // The second call's request already contained the first call's committed
    // turn: it queued behind the in-flight inference await.
    let requests = inference.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].contains(&turn(Role::Assistant, "first reply")));

    let mut conn = registry.attach(&room).await.unwrap();
    let history = history_of(conn.recv().await.unwrap());
    assert_eq!(
        history,
        vec![
            turn(Role::User, "first"),
            turn(Role::Assistant, "first reply"),
            turn(Role::User, "second"),
            turn(Role::Assistant, "second reply"),
        ]
    );
}

#[tokio::test]
async fn test_history_survives_eviction_and_restart() {
    let dir = tempdir().unwrap();
    let inference = ScriptedInference::new(vec![Ok("hello")]);
    let backend: Arc<dyn StateStore> = Arc::new(FsStore::new(dir.path()));
    let registry: Registry<ChatActor> =
        Registry::new(backend, inference.clone() as Arc<dyn Inference>);
    let room = name("room");

    registry.invoke(&room, "chat", vec![json!("hi")]).await.unwrap();
    registry.evict(&room).await.unwrap();

    let backend: Arc<dyn StateStore> = Arc::new(FsStore::new(dir.path()));
    let restarted: Registry<ChatActor> = Registry::new(backend, inference as Arc<dyn Inference>);
    let mut conn = restarted.attach(&room).await.unwrap();
    let history = history_of(conn.recv().await.unwrap());
    assert_eq!(
        history,
        vec![turn(Role::User, "hi"), turn(Role::Assistant, "hello")]
    );
}

#[tokio::test]
async fn test_only_chat_is_exposed() {
    let inference = ScriptedInference::new(vec![]);
    let registry = registry(inference);
    let room = name("room");

    let err = registry.invoke(&room, "get", vec![]).await.unwrap_err();
    assert!(matches!(err, ActorError::MethodNotExposed(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_chat_requires_a_string_argument() {
    let inference = ScriptedInference::new(vec![]);
    let registry = registry(inference.clone());
    let room = name("room");

    let err = registry
        .invoke(&room, "chat", vec![json!(42)])
        .await
        .unwrap_err();
    assert!(matches!(err, ActorError::InvalidArguments(_)), "got {:?}", err);

    let err = registry.invoke(&room, "chat", vec![]).await.unwrap_err();
    assert!(matches!(err, ActorError::InvalidArguments(_)), "got {:?}", err);

    // The capability was never consulted.
    assert!(inference.requests().is_empty());
}

#[tokio::test]
async fn test_rpc_result_is_independent_of_broadcast() {
    // A connection whose receiver is gone must not fail the triggering call.
    let inference = ScriptedInference::new(vec![Ok("hello")]);
    let registry = registry(inference);
    let room = name("room");

    let conn = registry.attach(&room).await.unwrap();
    drop(conn);

    let reply = registry
        .invoke(&room, "chat", vec![json!("hi")])
        .await
        .unwrap();
    assert_eq!(reply, Value::String("hello".to_string()));
}
