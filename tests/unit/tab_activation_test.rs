use std::sync::Arc;

use rstest::rstest;
use serde_json::{json, Map, Value};

use tab_positioner::app::Background;
use tab_positioner::handlers::tab_activation::activation_target_index;
use tab_positioner::host::{HostTabs, HostWindows, MemoryHost};
use tab_positioner::services::settings_engine::save_partial;
use tab_positioner::storage::MemoryStore;
use tab_positioner::types::settings::TabActivationPosition;
use tab_positioner::types::tab::WindowKind;

// === Pure target computation ===

#[rstest]
#[case(TabActivationPosition::Default, 1, 3, None)]
#[case(TabActivationPosition::BeforeRemoved, 1, 3, Some(0))]
// Clamped at the strip's start when the removed tab was first.
#[case(TabActivationPosition::BeforeRemoved, 0, 3, Some(0))]
#[case(TabActivationPosition::AfterRemoved, 1, 3, Some(1))]
#[case(TabActivationPosition::WindowFirst, 2, 3, Some(0))]
#[case(TabActivationPosition::WindowLast, 0, 3, Some(2))]
fn test_activation_target_index(
    #[case] setting: TabActivationPosition,
    #[case] recent: i64,
    #[case] remaining: usize,
    #[case] expected: Option<i64>,
) {
    assert_eq!(activation_target_index(setting, recent, remaining), expected);
}

// === Scenarios against the in-memory host ===

async fn engine_with(settings: &[(&str, Value)]) -> (Arc<MemoryHost>, Arc<Background>) {
    let sync_store = Arc::new(MemoryStore::new());
    let chosen: Map<String, Value> = settings
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    save_partial(sync_store.as_ref(), chosen, true).await;

    let host = MemoryHost::new();
    let background = Background::new(
        Arc::new(MemoryStore::new()),
        sync_store,
        Arc::clone(&host) as Arc<dyn HostTabs>,
        Arc::clone(&host) as Arc<dyn HostWindows>,
    )
    .await;
    host.set_dispatcher(Background::wire(&background));
    host.fire_installed().await;
    (host, background)
}

/// One window with three tabs, the middle one active.
async fn three_tabs(host: &MemoryHost) -> (i64, i64, i64, i64) {
    let w = host.create_window(WindowKind::Normal).await;
    let t1 = host.create_tab(w, Some("https://a.example"), true, None).await;
    let t2 = host.create_tab(w, Some("https://b.example"), false, None).await;
    let t3 = host.create_tab(w, Some("https://c.example"), false, None).await;
    host.activate_tab(t2).await;
    (w, t1, t2, t3)
}

#[tokio::test]
async fn test_before_removed_activates_left_neighbor() {
    let (host, _bg) =
        engine_with(&[("after_close_activation", json!("before_removed")),
                      ("removal_batch_threshold_ms", json!(0))])
        .await;
    let (w, t1, t2, _t3) = three_tabs(&host).await;

    host.close_tab(t2).await;

    // The host's default choice (the right neighbor) is overridden.
    assert_eq!(host.active_tab(w), Some(t1));
    assert_eq!(host.activate_calls(), 1);
}

#[tokio::test]
async fn test_after_removed_activates_slot_successor() {
    let (host, _bg) =
        engine_with(&[("after_close_activation", json!("after_removed")),
                      ("removal_batch_threshold_ms", json!(0))])
        .await;
    let (w, _t1, t2, t3) = three_tabs(&host).await;

    host.close_tab(t2).await;

    assert_eq!(host.active_tab(w), Some(t3));
}

#[tokio::test]
async fn test_window_first_activation() {
    let (host, _bg) =
        engine_with(&[("after_close_activation", json!("window_first")),
                      ("removal_batch_threshold_ms", json!(0))])
        .await;
    let (w, t1, _t2, t3) = three_tabs(&host).await;
    host.activate_tab(t3).await;

    host.close_tab(t3).await;

    assert_eq!(host.active_tab(w), Some(t1));
}

#[tokio::test]
async fn test_window_last_activation() {
    let (host, _bg) =
        engine_with(&[("after_close_activation", json!("window_last")),
                      ("removal_batch_threshold_ms", json!(0))])
        .await;
    let (w, t1, _t2, t3) = three_tabs(&host).await;
    host.activate_tab(t1).await;

    host.close_tab(t1).await;

    assert_eq!(host.active_tab(w), Some(t3));
}

#[tokio::test]
async fn test_default_leaves_host_choice_standing() {
    let (host, _bg) = engine_with(&[("removal_batch_threshold_ms", json!(0))]).await;
    let (w, _t1, t2, t3) = three_tabs(&host).await;

    host.close_tab(t2).await;

    // Host default: the tab that slid into the removed tab's slot.
    assert_eq!(host.active_tab(w), Some(t3));
    assert_eq!(host.activate_calls(), 0);
}

#[tokio::test]
async fn test_background_tab_removal_does_not_reactivate() {
    let (host, _bg) =
        engine_with(&[("after_close_activation", json!("window_first")),
                      ("removal_batch_threshold_ms", json!(0))])
        .await;
    let (w, _t1, t2, t3) = three_tabs(&host).await;

    host.close_tab(t3).await;

    assert_eq!(host.active_tab(w), Some(t2));
    assert_eq!(host.activate_calls(), 0);
}

#[tokio::test]
async fn test_removal_burst_falls_back_to_host_default() {
    // Default 100ms threshold: only the first removal is far enough from its
    // predecessor to be treated as a deliberate close.
    let (host, _bg) =
        engine_with(&[("after_close_activation", json!("before_removed"))]).await;
    let (w, t1, t2, t3) = three_tabs(&host).await;

    host.close_tab(t2).await;
    assert_eq!(host.active_tab(w), Some(t1));

    host.close_tab(t1).await;
    // Second close arrives inside the batch window; host default stands.
    assert_eq!(host.active_tab(w), Some(t3));
    assert_eq!(host.activate_calls(), 1);
}

#[tokio::test]
async fn test_closing_sole_tab_closes_window() {
    let (host, _bg) =
        engine_with(&[("after_close_activation", json!("window_last")),
                      ("removal_batch_threshold_ms", json!(0))])
        .await;
    let w = host.create_window(WindowKind::Normal).await;
    let t1 = host.create_tab(w, Some("https://a.example"), true, None).await;

    host.close_tab(t1).await;

    assert!(!host.has_window(w));
    assert_eq!(host.activate_calls(), 0);
}
