use std::fmt;

use crate::types::tab::{TabId, WindowId};

// === StorageError ===

/// Errors from the durable key-value stores.
///
/// These are caught at the storage boundary and degrade to "absent" on read
/// and "best effort failed" on write; they never crash an event handler.
#[derive(Debug)]
pub enum StorageError {
    /// The backing store is unavailable (host shutdown, missing file).
    Unavailable(String),
    /// The store rejected a write (quota, rate limit).
    WriteFailed(String),
    /// Failed to serialize or deserialize a stored value.
    Serialization(String),
    /// An I/O error occurred in a file-backed store.
    IoError(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable(msg) => write!(f, "Storage unavailable: {}", msg),
            StorageError::WriteFailed(msg) => write!(f, "Storage write failed: {}", msg),
            StorageError::Serialization(msg) => {
                write!(f, "Storage serialization error: {}", msg)
            }
            StorageError::IoError(msg) => write!(f, "Storage I/O error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug)]
pub enum SettingsError {
    /// Reading or writing the settings store failed.
    Storage(String),
    /// Failed to serialize or deserialize settings.
    Serialization(String),
    /// The provided settings key is not part of the schema.
    InvalidKey(String),
    /// The provided settings value is outside its declared domain.
    InvalidValue { key: String, value: String },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Storage(msg) => write!(f, "Settings storage error: {}", msg),
            SettingsError::Serialization(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue { key, value } => {
                write!(f, "Invalid settings value for {}: {}", key, value)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

// === HostError ===

/// Errors returned by host mutation and query calls.
///
/// Stale-reference errors are expected under normal races (a tab closed
/// between decision and action) and are logged at debug level, never
/// propagated as a crash.
#[derive(Debug)]
pub enum HostError {
    /// No tab with the given id exists.
    NoSuchTab(TabId),
    /// No window with the given id exists.
    NoSuchWindow(WindowId),
    /// The host rejected the call.
    Rejected(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::NoSuchTab(id) => write!(f, "No tab with id: {}", id),
            HostError::NoSuchWindow(id) => write!(f, "No window with id: {}", id),
            HostError::Rejected(msg) => write!(f, "Host call rejected: {}", msg),
        }
    }
}

impl std::error::Error for HostError {}
