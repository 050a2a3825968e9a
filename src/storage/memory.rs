use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use crate::types::errors::StorageError;
use crate::types::BoxFuture;

use super::KeyValueStore;

/// In-memory key-value store.
///
/// Stands in for the host's session storage area in tests and the demo
/// binary. Counts writes so tests can observe checkpoint coalescing, and can
/// be switched into a failing mode to exercise degradation paths.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
    write_count: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls since construction.
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// When enabled, every operation fails with `StorageError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of all current entries, for assertions.
    pub fn entries(&self) -> HashMap<String, Value> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("memory store failing".into()))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>, StorageError>> {
        let result = self.check_available().map(|_| {
            match self.entries.lock() {
                Ok(guard) => guard.get(key).cloned(),
                Err(poisoned) => poisoned.into_inner().get(key).cloned(),
            }
        });
        Box::pin(async move { result })
    }

    fn set<'a>(&'a self, key: &'a str, value: Value) -> BoxFuture<'a, Result<(), StorageError>> {
        let result = self.check_available().map(|_| {
            match self.entries.lock() {
                Ok(mut guard) => {
                    guard.insert(key.to_string(), value);
                }
                Err(poisoned) => {
                    poisoned.into_inner().insert(key.to_string(), value);
                }
            }
            self.write_count.fetch_add(1, Ordering::SeqCst);
        });
        Box::pin(async move { result })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StorageError>> {
        let result = self.check_available().map(|_| {
            match self.entries.lock() {
                Ok(mut guard) => {
                    guard.remove(key);
                }
                Err(poisoned) => {
                    poisoned.into_inner().remove(key);
                }
            }
        });
        Box::pin(async move { result })
    }

    fn clear<'a>(&'a self) -> BoxFuture<'a, Result<(), StorageError>> {
        let result = self.check_available().map(|_| {
            match self.entries.lock() {
                Ok(mut guard) => guard.clear(),
                Err(poisoned) => poisoned.into_inner().clear(),
            }
        });
        Box::pin(async move { result })
    }
}
