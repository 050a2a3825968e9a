//! Settings engine.
//!
//! Sanitizes and persists user-chosen policy values against a fixed schema.
//! Any value read from storage that is not a member of its declared domain is
//! replaced by the default and reported, never silently propagated. The
//! options UI is an opaque producer/consumer of the sanitized settings
//! object through `load_settings` / `save_partial`.

use std::sync::Arc;

use log::warn;
use serde_json::{Map, Value};

use crate::services::checkpoint::{CheckpointName, Checkpointed};
use crate::storage::KeyValueStore;
use crate::types::settings::ExtensionSettings;

/// Declared domain of one setting.
#[derive(Debug, Clone, Copy)]
pub enum SettingSchema {
    /// Closed enumeration of allowed string values.
    Choices(&'static [&'static str]),
    /// Non-negative integer.
    Number,
    Boolean,
}

const POSITION_CHOICES: &[&str] = &[
    "default",
    "before_active",
    "after_active",
    "window_first",
    "window_last",
];

const ACTIVATION_CHOICES: &[&str] = &[
    "default",
    "before_removed",
    "after_removed",
    "window_first",
    "window_last",
];

const POPUP_CHOICES: &[&str] = &["default", "new_foreground_tab", "new_background_tab"];

/// The full setting schema: key, declared domain. Defaults come from
/// `ExtensionSettings::default()`.
pub const SETTING_SCHEMAS: &[(&str, SettingSchema)] = &[
    ("new_tab_position", SettingSchema::Choices(POSITION_CHOICES)),
    (
        "foreground_link_position",
        SettingSchema::Choices(POSITION_CHOICES),
    ),
    (
        "background_link_position",
        SettingSchema::Choices(POSITION_CHOICES),
    ),
    (
        "after_close_activation",
        SettingSchema::Choices(ACTIVATION_CHOICES),
    ),
    ("popup_position", SettingSchema::Choices(POPUP_CHOICES)),
    ("creation_batch_threshold_ms", SettingSchema::Number),
    ("removal_batch_threshold_ms", SettingSchema::Number),
    ("persistent_background", SettingSchema::Boolean),
];

fn schema_accepts(schema: &SettingSchema, value: &Value) -> bool {
    match schema {
        SettingSchema::Choices(choices) => value
            .as_str()
            .map_or(false, |s| choices.contains(&s)),
        SettingSchema::Number => value.is_u64(),
        SettingSchema::Boolean => value.is_boolean(),
    }
}

/// Merges raw values over the defaults, substituting the default for every
/// value outside its declared domain and emitting a diagnostic naming the
/// offending key, value, and source.
pub fn sanitize_settings(raw: &Map<String, Value>, source: &str) -> ExtensionSettings {
    let mut merged = match serde_json::to_value(ExtensionSettings::default()) {
        Ok(Value::Object(map)) => map,
        // Unreachable for a struct with named fields.
        _ => Map::new(),
    };
    for (key, schema) in SETTING_SCHEMAS {
        let Some(value) = raw.get(*key) else {
            continue;
        };
        if schema_accepts(schema, value) {
            merged.insert((*key).to_string(), value.clone());
        } else {
            warn!(
                "Invalid setting value for {}: {} in '{}'",
                key, value, source
            );
        }
    }
    serde_json::from_value(Value::Object(merged)).unwrap_or_default()
}

/// Loads the sanitized settings from the user-synced store. A storage
/// failure degrades to defaults.
pub async fn load_settings(store: &dyn KeyValueStore) -> ExtensionSettings {
    let mut raw = Map::new();
    for (key, _) in SETTING_SCHEMAS {
        match store.get(key).await {
            Ok(Some(value)) => {
                raw.insert((*key).to_string(), value);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("settings read failed for {}: {}", key, e);
            }
        }
    }
    sanitize_settings(&raw, "sync storage")
}

/// Persists a full settings object, one flat key per setting. Best effort;
/// write failures are logged.
pub async fn save_settings(store: &dyn KeyValueStore, settings: &ExtensionSettings) {
    let object = match serde_json::to_value(settings) {
        Ok(Value::Object(map)) => map,
        _ => return,
    };
    for (key, value) in object {
        if let Err(e) = store.set(&key, value).await {
            warn!("settings write failed for {}: {}", key, e);
        }
    }
}

/// Merges a partial raw update (as produced by the options UI) into the
/// stored settings, sanitizing by default.
pub async fn save_partial(
    store: &dyn KeyValueStore,
    partial: Map<String, Value>,
    sanitize: bool,
) {
    if sanitize {
        let mut current = match serde_json::to_value(load_settings(store).await) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for (key, value) in partial {
            current.insert(key, value);
        }
        let sanitized = sanitize_settings(&current, "options UI");
        save_settings(store, &sanitized).await;
    } else {
        for (key, value) in partial {
            if let Err(e) = store.set(&key, value).await {
                warn!("settings write failed for {}: {}", key, e);
            }
        }
    }
}

/// Resets the user-synced store to defaults.
pub async fn clear_settings(store: &dyn KeyValueStore) {
    if let Err(e) = store.clear().await {
        warn!("settings clear failed: {}", e);
    }
}

/// Checkpointed in-memory settings cache.
///
/// The policy handlers read from this cache instead of hitting the slow sync
/// store on every event; it is refreshed on install, startup, and sync-store
/// change notifications.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SyncSettings {
    settings: ExtensionSettings,
}

impl CheckpointName for SyncSettings {
    const NAME: &'static str = "SyncSettings";
}

impl SyncSettings {
    pub fn get(&self) -> &ExtensionSettings {
        &self.settings
    }

    pub fn replace(&mut self, settings: ExtensionSettings) {
        self.settings = settings;
    }
}

/// Re-reads the sync store, updates the cache, schedules a checkpoint, and
/// writes the sanitized values back so invalid stored values are corrected
/// in place.
pub async fn refresh_settings(
    cache: &Arc<Checkpointed<SyncSettings>>,
    sync_store: &dyn KeyValueStore,
) -> ExtensionSettings {
    let settings = load_settings(sync_store).await;
    cache.with_mut(|c| c.replace(settings.clone()));
    Checkpointed::schedule_save(cache);
    save_settings(sync_store, &settings).await;
    settings
}
