use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};

use crate::platform;
use crate::types::errors::StorageError;
use crate::types::BoxFuture;

use super::KeyValueStore;

/// File-backed key-value store holding one JSON object per file.
///
/// Used for the user-synced settings area in the demo binary. Reads and
/// writes the whole object on every operation; settings changes are rare,
/// user-driven events, so this is acceptable.
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    /// Creates a FileStore at the given path, or at
    /// `<config dir>/settings.json` when `path_override` is `None`.
    pub fn new(path_override: Option<PathBuf>) -> Self {
        let path = match path_override {
            Some(p) => p,
            None => platform::get_config_dir().join("settings.json"),
        };
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_object(&self) -> Result<Map<String, Value>, StorageError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| StorageError::IoError(format!("failed to read {:?}: {}", self.path, e)))?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| StorageError::Serialization(format!("failed to parse {:?}: {}", self.path, e)))?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(StorageError::Serialization(format!(
                "{:?} does not contain a JSON object",
                self.path
            ))),
        }
    }

    fn write_object(&self, map: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StorageError::IoError(format!("failed to create {:?}: {}", parent, e))
            })?;
        }
        let json = serde_json::to_string_pretty(&Value::Object(map.clone()))
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(&self.path, json)
            .map_err(|e| StorageError::WriteFailed(format!("failed to write {:?}: {}", self.path, e)))
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        match self.lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>, StorageError>> {
        let result = {
            let _guard = self.guard();
            self.read_object().map(|map| map.get(key).cloned())
        };
        Box::pin(async move { result })
    }

    fn set<'a>(&'a self, key: &'a str, value: Value) -> BoxFuture<'a, Result<(), StorageError>> {
        let result = {
            let _guard = self.guard();
            self.read_object().and_then(|mut map| {
                map.insert(key.to_string(), value);
                self.write_object(&map)
            })
        };
        Box::pin(async move { result })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StorageError>> {
        let result = {
            let _guard = self.guard();
            self.read_object().and_then(|mut map| {
                map.remove(key);
                self.write_object(&map)
            })
        };
        Box::pin(async move { result })
    }

    fn clear<'a>(&'a self) -> BoxFuture<'a, Result<(), StorageError>> {
        let result = {
            let _guard = self.guard();
            self.write_object(&Map::new())
        };
        Box::pin(async move { result })
    }
}
