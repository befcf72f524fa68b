//! Observable local key-value store.
//!
//! Stands in for the host application's local storage. Every write is
//! published to subscribed listeners together with its origin, so the change
//! queue can observe host edits without replacing a shared primitive, and so
//! the engine's own writes can be told apart from the host's.

use crate::error::{SyncError, SyncResult};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Who issued a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    /// The host application (user edits).
    Host,
    /// The sync layer itself (pulled data, session keys).
    Internal,
}

/// Receives every write made to a [`LocalStore`].
///
/// Called synchronously on the writing thread, after the value is stored.
pub trait StoreListener: Send + Sync {
    fn on_write(&self, key: &str, value: &str, origin: WriteOrigin);
}

/// Handle returned by [`LocalStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Shared string-to-string namespace with write notification.
#[derive(Default)]
pub struct LocalStore {
    entries: RwLock<BTreeMap<String, String>>,
    listeners: RwLock<Vec<(SubscriptionId, Arc<dyn StoreListener>)>>,
    next_id: AtomicU64,
}

impl LocalStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a store from a JSON snapshot. A missing file yields an empty store.
    pub fn load_snapshot(path: &Path) -> SyncResult<Self> {
        let store = Self::new();
        if !path.exists() {
            return Ok(store);
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Storage(format!("read {}: {e}", path.display())))?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&raw)?;
        debug!("Loaded {} keys from {}", entries.len(), path.display());
        *write_lock(&store.entries) = entries;
        Ok(store)
    }

    /// Writes the current contents as a JSON object.
    pub fn save_snapshot(&self, path: &Path) -> SyncResult<()> {
        let json = serde_json::to_string_pretty(&*read_lock(&self.entries))?;
        std::fs::write(path, json)
            .map_err(|e| SyncError::Storage(format!("write {}: {e}", path.display())))
    }

    /// Host-origin write.
    pub fn write(&self, key: &str, value: &str) {
        self.write_with_origin(key, value, WriteOrigin::Host);
    }

    /// Write issued by the sync layer; listeners see `WriteOrigin::Internal`.
    pub fn write_internal(&self, key: &str, value: &str) {
        self.write_with_origin(key, value, WriteOrigin::Internal);
    }

    /// Stores the value, then notifies listeners in subscription order.
    pub fn write_with_origin(&self, key: &str, value: &str, origin: WriteOrigin) {
        write_lock(&self.entries).insert(key.to_string(), value.to_string());

        // Listeners may read back from the store; never hold a lock across them.
        let listeners: Vec<Arc<dyn StoreListener>> = read_lock(&self.listeners)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener.on_write(key, value, origin);
        }
    }

    /// Reads a value.
    pub fn read(&self, key: &str) -> Option<String> {
        read_lock(&self.entries).get(key).cloned()
    }

    /// Removes a key. Not published to listeners.
    pub fn remove(&self, key: &str) -> Option<String> {
        write_lock(&self.entries).remove(key)
    }

    /// Removes every key. Not published to listeners.
    pub fn clear(&self) {
        write_lock(&self.entries).clear();
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        read_lock(&self.entries).keys().cloned().collect()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        read_lock(&self.entries).len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        read_lock(&self.entries).is_empty()
    }

    /// Registers a listener for subsequent writes.
    pub fn subscribe(&self, listener: Arc<dyn StoreListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        write_lock(&self.listeners).push((id, listener));
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = write_lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        read_lock(&self.listeners).len()
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("keys", &self.len())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

pub(crate) fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
