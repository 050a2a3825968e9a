use std::sync::Arc;

use rstest::rstest;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

use tab_positioner::services::checkpoint::Checkpointed;
use tab_positioner::services::settings_engine::{
    clear_settings, load_settings, refresh_settings, sanitize_settings, save_partial,
    save_settings, SyncSettings,
};
use tab_positioner::storage::{FileStore, KeyValueStore, MemoryStore};
use tab_positioner::types::settings::{
    ExtensionSettings, PopupPosition, TabActivationPosition, TabCreationPosition,
};

fn raw(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

// === Sanitization ===

#[test]
fn test_sanitize_empty_input_yields_defaults() {
    let settings = sanitize_settings(&Map::new(), "test");
    assert_eq!(settings, ExtensionSettings::default());
}

#[test]
fn test_sanitize_keeps_valid_values() {
    let settings = sanitize_settings(
        &raw(&[
            ("new_tab_position", json!("window_last")),
            ("after_close_activation", json!("before_removed")),
            ("popup_position", json!("new_background_tab")),
            ("creation_batch_threshold_ms", json!(250)),
            ("persistent_background", json!(true)),
        ]),
        "test",
    );
    assert_eq!(settings.new_tab_position, TabCreationPosition::WindowLast);
    assert_eq!(
        settings.after_close_activation,
        TabActivationPosition::BeforeRemoved
    );
    assert_eq!(settings.popup_position, PopupPosition::NewBackgroundTab);
    assert_eq!(settings.creation_batch_threshold_ms, 250);
    assert!(settings.persistent_background);
}

#[rstest]
#[case("new_tab_position", json!("sideways"))]
#[case("new_tab_position", json!(3))]
#[case("foreground_link_position", json!("before_removed"))]
#[case("after_close_activation", json!("after_active"))]
#[case("popup_position", json!("window_first"))]
#[case("creation_batch_threshold_ms", json!(-5))]
#[case("creation_batch_threshold_ms", json!("100"))]
#[case("removal_batch_threshold_ms", json!(1.5))]
#[case("persistent_background", json!("yes"))]
fn test_sanitize_replaces_out_of_domain_value(#[case] key: &str, #[case] value: Value) {
    let settings = sanitize_settings(&raw(&[(key, value)]), "test");
    assert_eq!(settings, ExtensionSettings::default());
}

#[test]
fn test_sanitize_ignores_unknown_keys() {
    let settings = sanitize_settings(&raw(&[("no_such_setting", json!("x"))]), "test");
    assert_eq!(settings, ExtensionSettings::default());
}

#[test]
fn test_sanitize_mixes_valid_and_invalid() {
    let settings = sanitize_settings(
        &raw(&[
            ("foreground_link_position", json!("after_active")),
            ("background_link_position", json!("bogus")),
        ]),
        "test",
    );
    assert_eq!(
        settings.foreground_link_position,
        TabCreationPosition::AfterActive
    );
    assert_eq!(
        settings.background_link_position,
        TabCreationPosition::Default
    );
}

// === Store round-trips ===

#[tokio::test]
async fn test_save_then_load_memory_store() {
    let store = MemoryStore::new();
    let mut settings = ExtensionSettings::default();
    settings.new_tab_position = TabCreationPosition::AfterActive;
    settings.removal_batch_threshold_ms = 42;

    save_settings(&store, &settings).await;
    let loaded = load_settings(&store).await;
    assert_eq!(loaded, settings);
}

#[tokio::test]
async fn test_load_sanitizes_stored_garbage() {
    let store = MemoryStore::new();
    store.set("popup_position", json!("diagonal")).await.unwrap();
    store.set("persistent_background", json!(true)).await.unwrap();
    let loaded = load_settings(&store).await;
    assert_eq!(loaded.popup_position, PopupPosition::Default);
    assert!(loaded.persistent_background);
}

#[tokio::test]
async fn test_load_from_failing_store_degrades_to_defaults() {
    let store = MemoryStore::new();
    store.set_failing(true);
    let loaded = load_settings(&store).await;
    assert_eq!(loaded, ExtensionSettings::default());
}

#[tokio::test]
async fn test_save_partial_merges_and_sanitizes() {
    let store = MemoryStore::new();
    let mut settings = ExtensionSettings::default();
    settings.foreground_link_position = TabCreationPosition::WindowFirst;
    save_settings(&store, &settings).await;

    save_partial(
        &store,
        raw(&[
            ("popup_position", json!("new_foreground_tab")),
            ("after_close_activation", json!("nonsense")),
        ]),
        true,
    )
    .await;

    let loaded = load_settings(&store).await;
    // Untouched keys survive the partial write.
    assert_eq!(
        loaded.foreground_link_position,
        TabCreationPosition::WindowFirst
    );
    assert_eq!(loaded.popup_position, PopupPosition::NewForegroundTab);
    assert_eq!(loaded.after_close_activation, TabActivationPosition::Default);
}

#[tokio::test]
async fn test_clear_settings_restores_defaults() {
    let store = MemoryStore::new();
    let mut settings = ExtensionSettings::default();
    settings.persistent_background = true;
    save_settings(&store, &settings).await;

    clear_settings(&store).await;
    assert_eq!(load_settings(&store).await, ExtensionSettings::default());
}

#[tokio::test]
async fn test_file_store_roundtrip_across_instances() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");

    let store = FileStore::new(Some(path.clone()));
    let mut settings = ExtensionSettings::default();
    settings.background_link_position = TabCreationPosition::WindowLast;
    settings.creation_batch_threshold_ms = 0;
    save_settings(&store, &settings).await;

    // A completely new instance reading the same file sees the values.
    let reopened = FileStore::new(Some(path));
    assert_eq!(load_settings(&reopened).await, settings);
}

#[test]
fn test_file_store_defaults_to_platform_config_dir() {
    let store = FileStore::new(None);
    assert!(store.path().starts_with(tab_positioner::platform::get_config_dir()));
    assert_eq!(store.path().file_name(), Some("settings.json".as_ref()));
}

#[tokio::test]
async fn test_file_store_missing_file_loads_defaults() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(Some(dir.path().join("absent.json")));
    assert_eq!(load_settings(&store).await, ExtensionSettings::default());
}

// === Cached refresh ===

#[tokio::test]
async fn test_refresh_updates_cache_and_corrects_store() {
    let session = Arc::new(MemoryStore::new());
    let sync = MemoryStore::new();
    sync.set("new_tab_position", json!("window_first")).await.unwrap();
    sync.set("popup_position", json!("broken")).await.unwrap();

    let cache: Arc<Checkpointed<SyncSettings>> =
        Arc::new(Checkpointed::load(session).await);
    let refreshed = refresh_settings(&cache, &sync).await;

    assert_eq!(refreshed.new_tab_position, TabCreationPosition::WindowFirst);
    assert_eq!(refreshed.popup_position, PopupPosition::Default);
    assert_eq!(cache.with(|c| c.get().clone()), refreshed);
    // The invalid stored value was rewritten in place.
    assert_eq!(
        sync.entries().get("popup_position"),
        Some(&json!("default"))
    );
}
