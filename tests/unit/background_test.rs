use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map};

use tab_positioner::app::Background;
use tab_positioner::host::{HostTabs, HostWindows, MemoryHost};
use tab_positioner::services::settings_engine::save_partial;
use tab_positioner::storage::{KeyValueStore, MemoryStore};
use tab_positioner::types::events::EventKind;
use tab_positioner::types::settings::TabCreationPosition;
use tab_positioner::types::tab::WindowKind;

async fn engine(
    session_store: Arc<MemoryStore>,
    sync_store: Arc<MemoryStore>,
) -> (Arc<MemoryHost>, Arc<Background>) {
    let host = MemoryHost::new();
    let background = Background::new(
        session_store,
        sync_store,
        Arc::clone(&host) as Arc<dyn HostTabs>,
        Arc::clone(&host) as Arc<dyn HostWindows>,
    )
    .await;
    host.set_dispatcher(Background::wire(&background));
    (host, background)
}

#[tokio::test]
async fn test_wiring_registers_tracker_before_policies() {
    let (_host, background) = engine(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
    )
    .await;
    let dispatcher = Background::wire(&background);

    // Tracker plus policy handler for created/removed; tracker only for the
    // rest.
    assert_eq!(dispatcher.handler_count(EventKind::TabCreated), 2);
    assert_eq!(dispatcher.handler_count(EventKind::TabRemoved), 2);
    assert_eq!(dispatcher.handler_count(EventKind::TabActivated), 1);
    assert_eq!(dispatcher.handler_count(EventKind::PopupCreated), 1);
    assert_eq!(dispatcher.handler_count(EventKind::Installed), 1);
    assert_eq!(dispatcher.handler_count(EventKind::SettingsChanged), 1);
}

#[tokio::test]
async fn test_install_refreshes_and_corrects_settings() {
    let sync_store = Arc::new(MemoryStore::new());
    sync_store
        .set("foreground_link_position", json!("after_active"))
        .await
        .unwrap();
    sync_store
        .set("new_tab_position", json!("upside_down"))
        .await
        .unwrap();

    let (host, background) = engine(Arc::new(MemoryStore::new()), sync_store.clone()).await;
    host.fire_installed().await;

    let cached = background.settings().with(|s| s.get().clone());
    assert_eq!(
        cached.foreground_link_position,
        TabCreationPosition::AfterActive
    );
    assert_eq!(cached.new_tab_position, TabCreationPosition::Default);
    // The invalid stored value was rewritten in place.
    assert_eq!(
        sync_store.entries().get("new_tab_position"),
        Some(&json!("default"))
    );
}

#[tokio::test]
async fn test_settings_change_updates_cache_live() {
    let sync_store = Arc::new(MemoryStore::new());
    let (host, background) = engine(Arc::new(MemoryStore::new()), sync_store.clone()).await;
    host.fire_installed().await;

    let mut chosen = Map::new();
    chosen.insert("popup_position".to_string(), json!("new_background_tab"));
    save_partial(sync_store.as_ref(), chosen, true).await;
    host.notify_settings_changed().await;

    let cached = background.settings().with(|s| s.get().clone());
    assert_eq!(
        cached.popup_position,
        tab_positioner::types::settings::PopupPosition::NewBackgroundTab
    );
}

#[tokio::test]
async fn test_install_enumerates_open_tabs() {
    let (host, background) = engine(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
    )
    .await;
    // Tabs already open before the engine comes up (no created events fired
    // through the dispatcher for them yet, since install has not run).
    let w = host.create_window(WindowKind::Normal).await;
    let t1 = host.create_tab(w, Some("https://a.example"), true, None).await;
    let t2 = host.create_tab(w, Some("https://b.example"), false, None).await;

    host.fire_installed().await;

    let tabs = background.tracker().with(|t| t.get_current_tabs(w));
    let ids: Vec<i64> = tabs.iter().map(|t| t.id).collect();
    assert!(ids.contains(&t1));
    assert!(ids.contains(&t2));
}

#[tokio::test]
async fn test_cold_start_restores_checkpoint() {
    let session_store = Arc::new(MemoryStore::new());

    // First life: build up state and let the checkpoint land.
    {
        let (host, _background) =
            engine(session_store.clone(), Arc::new(MemoryStore::new())).await;
        host.fire_installed().await;
        let w = host.create_window(WindowKind::Normal).await;
        host.create_tab(w, Some("https://a.example"), true, None).await;
        host.create_tab(w, Some("https://b.example"), false, None).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    assert!(session_store.entries().contains_key("TabsInfo:_instances"));

    // Second life: a fresh background on the same session store. The
    // restored checkpoint wins; startup must not re-enumerate the (empty)
    // host over it.
    let (host2, background2) =
        engine(session_store.clone(), Arc::new(MemoryStore::new())).await;
    assert!(background2.tracker().with(|t| !t.is_empty()));
    host2.fire_startup().await;
    assert!(background2.tracker().with(|t| !t.is_empty()));
}

#[tokio::test]
async fn test_keep_alive_follows_persistence_setting() {
    let sync_store = Arc::new(MemoryStore::new());
    sync_store
        .set("persistent_background", json!(true))
        .await
        .unwrap();
    let (host, background) = engine(Arc::new(MemoryStore::new()), sync_store.clone()).await;

    host.fire_installed().await;
    assert!(background.keep_alive_running());

    sync_store
        .set("persistent_background", json!(false))
        .await
        .unwrap();
    host.notify_settings_changed().await;
    assert!(!background.keep_alive_running());
}

#[tokio::test]
async fn test_popup_focus_does_not_become_recent_window() {
    let (host, background) = engine(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
    )
    .await;
    host.fire_installed().await;
    let w = host.create_window(WindowKind::Normal).await;
    host.create_tab(w, Some("https://a.example"), true, None).await;

    let (_popup, _p) = host.open_popup(Some("https://popup.example")).await;

    assert_eq!(background.tracker().with(|t| t.get_recent_window_id()), w);
}

#[tokio::test]
async fn test_pinning_resyncs_stale_recent_tab() {
    let (host, background) = engine(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
    )
    .await;
    host.fire_installed().await;
    let w = host.create_window(WindowKind::Normal).await;
    let t1 = host.create_tab(w, Some("https://a.example"), true, None).await;
    let t2 = host.create_tab(w, Some("https://b.example"), false, None).await;
    host.activate_tab(t2).await;

    // An in-window reposition fires no activation event, so the tracked
    // recent index goes stale.
    host.move_tab(t2, 0, None).await.unwrap();
    assert_eq!(host.tab_order(w), vec![t2, t1]);
    assert_eq!(
        background.tracker().with(|t| t.get_recent_tab(w).index),
        1
    );

    // Pinning fires an updated event and the handler re-queries the host.
    host.set_pinned(t2, true).await;
    assert_eq!(
        background.tracker().with(|t| t.get_recent_tab(w)),
        tab_positioner::types::tab::RecentTabInfo { id: t2, index: 0 }
    );
}

#[tokio::test]
async fn test_detach_attach_moves_tab_between_tracked_windows() {
    let (host, background) = engine(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
    )
    .await;
    host.fire_installed().await;
    let w1 = host.create_window(WindowKind::Normal).await;
    let t1 = host.create_tab(w1, Some("https://a.example"), true, None).await;
    let t2 = host.create_tab(w1, Some("https://b.example"), false, None).await;
    let w2 = host.create_window(WindowKind::Normal).await;
    host.create_tab(w2, Some("https://c.example"), true, None).await;

    host.transfer_tab(t2, w2).await;

    let tracker = background.tracker();
    assert_eq!(tracker.with(|t| t.find_window_containing(t2)), Some(w2));
    assert_eq!(
        tracker.with(|t| t.get_current_tabs(w1))
            .iter()
            .map(|r| r.id)
            .collect::<Vec<_>>(),
        vec![t1]
    );
}
