//! # Actor Registry
//!
//! Maps actor names to running instances and is the external entry point for
//! RPC invocation and connection attach. Resolution is idempotent and
//! location-transparent: callers never manage instance lifecycle, and an
//! evicted instance is transparently rebuilt from the persistent store the
//! next time its name is resolved.

use crate::actor::{Actor, ActorHandle, ActorRuntime};
use crate::connection::Connection;
use crate::errors::ActorError;
use crate::id::ActorName;
use crate::store::{StateStore, StorePartition};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// A registry of actors of one kind, keyed by name.
pub struct Registry<A: Actor> {
    store: Arc<dyn StateStore>,
    deps: A::Deps,
    actors: Arc<Mutex<HashMap<ActorName, ActorHandle>>>,
}

impl<A: Actor> Registry<A> {
    pub fn new(store: Arc<dyn StateStore>, deps: A::Deps) -> Self {
        Self {
            store,
            deps,
            actors: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Resolve `name` to its running instance, starting one if none is
    /// resident.
    ///
    /// Repeated calls with the same name return handles to the same instance
    /// while it is resident. Starting never fails; a state-loading error is
    /// deferred to the first operation executed against the instance.
    pub fn resolve(&self, name: &ActorName) -> ActorHandle {
        let mut actors = self.actors.lock().unwrap();
        actors
            .entry(name.clone())
            .or_insert_with(|| {
                debug!(actor = %name, kind = A::kind(), "starting actor instance");
                let scope = format!("{}/{}", A::kind(), name);
                let partition = StorePartition::new(self.store.clone(), scope);
                ActorRuntime::<A>::spawn(name.clone(), self.deps.clone(), partition)
            })
            .clone()
    }

    /// Invoke an exposed method on the named actor.
    ///
    /// The allow-list is checked before the actor is resolved, so a
    /// non-exposed method is rejected without touching any state.
    pub async fn invoke(
        &self,
        name: &ActorName,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, ActorError> {
        if !A::exposed().iter().any(|m| *m == method) {
            return Err(ActorError::MethodNotExposed(method.to_string()));
        }
        self.resolve(name).call(method, args).await
    }

    /// Attach a live connection to the named actor.
    ///
    /// The returned connection already has the welcome snapshot queued.
    pub async fn attach(&self, name: &ActorName) -> Result<Connection, ActorError> {
        self.resolve(name).attach().await
    }

    /// Shut the named instance down and drop it from the registry.
    ///
    /// Operations already queued complete first. A later `resolve` recreates
    /// the instance with state reconstructed from the persistent store.
    ///
    /// The entry stays in the map until the old instance has fully drained,
    /// so a `resolve` racing the eviction finds the draining instance (whose
    /// remaining calls fail with `ShuttingDown`) rather than spawning a
    /// second instance over a state load the first is still writing to.
    pub async fn evict(&self, name: &ActorName) -> Result<(), ActorError> {
        let handle = { self.actors.lock().unwrap().get(name).cloned() };
        let Some(handle) = handle else {
            return Ok(());
        };
        info!(actor = %name, kind = A::kind(), "evicting actor instance");
        let result = handle.shutdown().await;

        let mut actors = self.actors.lock().unwrap();
        if actors
            .get(name)
            .is_some_and(|current| current.same_instance(&handle))
        {
            actors.remove(name);
        }
        match result {
            // A concurrent evict already drove this instance down.
            Err(ActorError::ChannelClosed) => Ok(()),
            other => other,
        }
    }

    /// Shut down every resident instance.
    pub async fn shutdown(&self) {
        let handles: Vec<(ActorName, ActorHandle)> =
            { self.actors.lock().unwrap().drain().collect() };
        for (name, handle) in handles {
            if let Err(e) = handle.shutdown().await {
                debug!(actor = %name, error = %e, "instance already gone at shutdown");
            }
        }
    }

    /// Names of currently resident instances.
    pub fn resident(&self) -> Vec<ActorName> {
        self.actors.lock().unwrap().keys().cloned().collect()
    }
}

impl<A: Actor> Clone for Registry<A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            deps: self.deps.clone(),
            actors: self.actors.clone(),
        }
    }
}

impl<A: Actor> std::fmt::Debug for Registry<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &A::kind())
            .field("resident", &self.actors.lock().unwrap().len())
            .finish()
    }
}
