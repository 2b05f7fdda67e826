//! # Persistent Store
//!
//! Durable, per-actor-scoped key/value storage. The store is the only place
//! actor state survives eviction or process restart: a recreated actor always
//! reconstructs its working state from here, never from memory.
//!
//! The store performs no serialization of its own. Callers are already inside
//! their actor's operation loop, so reads and writes issued within a single
//! operation are linearizable with respect to each other for that actor.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Errors from the persistent store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization: {0}")]
    Serialization(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A key/value storage backend.
///
/// `scope` partitions the keyspace per actor; two scopes never observe each
/// other's entries. Both operations are durable for the backend's definition
/// of durable (`FsStore` survives process restart, `MemoryStore` does not).
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, scope: &str, key: &str) -> Result<Option<Value>, StoreError>;
    async fn put(&self, scope: &str, key: &str, value: Value) -> Result<(), StoreError>;
}

/// A [`StateStore`] narrowed to a single actor's scope.
///
/// Actors only ever hold a partition, so cross-actor visibility is ruled out
/// at the type level.
#[derive(Clone)]
pub struct StorePartition {
    backend: Arc<dyn StateStore>,
    scope: String,
}

impl StorePartition {
    pub fn new(backend: Arc<dyn StateStore>, scope: impl Into<String>) -> Self {
        Self {
            backend,
            scope: scope.into(),
        }
    }

    /// The scope string this partition is bound to.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.backend.get(&self.scope, key).await
    }

    pub async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.backend.put(&self.scope, key, value).await
    }

    /// Serialize `value` and store it under `key`.
    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value =
            serde_json::to_value(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.put(key, value).await
    }
}

impl std::fmt::Debug for StorePartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorePartition")
            .field("scope", &self.scope)
            .finish()
    }
}

/// Filesystem-backed store: one JSON file per (scope, key) under a base
/// directory. Survives process restart.
pub struct FsStore {
    base: PathBuf,
}

impl FsStore {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    fn entry_path(&self, scope: &str, key: &str) -> PathBuf {
        self.base.join(scope).join(format!("{}.json", key))
    }
}

#[async_trait]
impl StateStore for FsStore {
    async fn get(&self, scope: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.entry_path(scope, key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };
        let value = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Serialization(format!("{}: {}", path.display(), e)))?;
        Ok(Some(value))
    }

    async fn put(&self, scope: &str, key: &str, value: Value) -> Result<(), StoreError> {
        let path = self.entry_path(scope, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let bytes =
            serde_json::to_vec(&value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        fs::write(&path, bytes).await?;
        debug!(scope, key, "stored value");
        Ok(())
    }
}

/// In-memory store for tests and ephemeral actors.
///
/// The failure switches let callers exercise storage-error paths: with
/// `fail_reads` or `fail_writes` set, the corresponding operation returns
/// [`StoreError::Unavailable`] without touching the entries.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, HashMap<String, Value>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, scope: &str, key: &str) -> Result<Option<Value>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(scope).and_then(|kv| kv.get(key)).cloned())
    }

    async fn put(&self, scope: &str, key: &str, value: Value) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        let mut entries = self.entries.lock().unwrap();
        entries
            .entry(scope.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }
}
