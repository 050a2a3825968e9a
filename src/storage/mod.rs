// Tab Positioner storage layer
// An async key-value abstraction over host-provided storage areas. The
// session area is ephemeral (lives for the browser session, survives
// background cold starts); the sync area is the slower, user-synced store
// that holds settings.

pub mod file;
pub mod memory;

use log::warn;
use serde_json::Value;

use crate::types::errors::StorageError;
use crate::types::BoxFuture;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Thin async key-value contract. Values are JSON-serializable.
///
/// Both operations may fail (quota, host shutdown mid-write); callers on the
/// event path go through [`get_session_state`] / [`set_session_state`], which
/// catch and log so a storage failure never crashes an event handler.
pub trait KeyValueStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>, StorageError>>;
    fn set<'a>(&'a self, key: &'a str, value: Value) -> BoxFuture<'a, Result<(), StorageError>>;
    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StorageError>>;
    fn clear<'a>(&'a self) -> BoxFuture<'a, Result<(), StorageError>>;
}

/// Reads a session-state value, treating any storage failure as "absent".
pub async fn get_session_state(store: &dyn KeyValueStore, key: &str) -> Option<Value> {
    match store.get(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!("session state read failed for {}: {}", key, e);
            None
        }
    }
}

/// Writes a session-state value, best effort. Failures are logged and
/// swallowed; the engine keeps operating on in-memory state and accepts that
/// a later cold start may lose recent history.
pub async fn set_session_state(store: &dyn KeyValueStore, key: &str, value: Value) {
    if let Err(e) = store.set(key, value).await {
        warn!("session state write failed for {}: {}", key, e);
    }
}
