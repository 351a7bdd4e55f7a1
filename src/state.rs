// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory tracking store for accepted resources.
//!
//! One [`Store`] exists per resource kind and is the authoritative cache of
//! "what we believe is live": the last resource object accepted for each
//! identity. It is shared between that kind's event handler and the drift
//! sweep, and guarded by a single asynchronous mutex so a sweep pass and an
//! in-flight handler never observe a torn read or write.
//!
//! The store is owned and injectable rather than a process-wide singleton:
//! tests instantiate isolated stores per case, and `main` wires one store per
//! kind into the handlers that share it.
//!
//! Nothing here is persisted. A process restart loses all tracked identities
//! until the watcher replays its initial listing through the handlers.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Build the store identity of a namespaced resource.
#[must_use]
pub fn object_id(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// Mutex-guarded mapping from resource identity to the last accepted
/// resource object of one kind.
///
/// Cloning a `Store` clones the handle, not the map; all clones share the
/// same underlying state and lock.
#[derive(Debug)]
pub struct Store<K> {
    inner: Arc<Mutex<BTreeMap<String, K>>>,
}

impl<K> Clone for Store<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> Default for Store<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Store<K> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Acquire the kind lock, giving the caller exclusive access to the map
    /// for the full duration of an operation.
    ///
    /// Handlers hold this guard across their blocking network and SQL calls;
    /// that serializes all operations of one kind against each other and
    /// against the drift sweep.
    pub async fn lock(&self) -> MutexGuard<'_, BTreeMap<String, K>> {
        self.inner.lock().await
    }

    /// Remove the tracked resource for `id`, returning it if present.
    pub async fn remove(&self, id: &str) -> Option<K> {
        self.inner.lock().await.remove(id)
    }

    /// Number of tracked resources.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether no resources are tracked.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

impl<K: Clone> Store<K> {
    /// Return a clone of the tracked resource for `id`, if any.
    pub async fn get(&self, id: &str) -> Option<K> {
        self.inner.lock().await.get(id).cloned()
    }

    /// Record `resource` as the last accepted object for `id`.
    pub async fn put(&self, id: impl Into<String>, resource: K) {
        self.inner.lock().await.insert(id.into(), resource);
    }

    /// Visit every tracked `(id, resource)` pair under the lock.
    pub async fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&str, &K),
    {
        for (id, resource) in self.inner.lock().await.iter() {
            visitor(id, resource);
        }
    }
}
