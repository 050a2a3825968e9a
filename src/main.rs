//! Tab Positioner — demo binary.
//!
//! Drives the engine against the in-memory host: configures a few placement
//! policies, simulates a browsing session, and prints what the policies did.
//! Set `RUST_LOG=debug` to watch the individual decisions.

use std::sync::Arc;

use serde_json::{json, Map};

use tab_positioner::app::Background;
use tab_positioner::host::MemoryHost;
use tab_positioner::services::settings_engine;
use tab_positioner::storage::{FileStore, MemoryStore};
use tab_positioner::types::tab::WindowKind;

#[tokio::main]
async fn main() {
    env_logger::init();

    println!();
    println!("Tab Positioner v{} — demo mode", env!("CARGO_PKG_VERSION"));
    println!();

    let session_store = Arc::new(MemoryStore::new());
    let sync_store = Arc::new(FileStore::new(None));
    println!("settings file: {}", sync_store.path().display());
    println!();

    // What a user would pick in the options UI. Batch thresholds go to zero
    // so the scripted burst below is not mistaken for a session restore.
    let mut chosen = Map::new();
    chosen.insert("foreground_link_position".into(), json!("after_active"));
    chosen.insert("after_close_activation".into(), json!("before_removed"));
    chosen.insert("popup_position".into(), json!("new_foreground_tab"));
    chosen.insert("creation_batch_threshold_ms".into(), json!(0));
    chosen.insert("removal_batch_threshold_ms".into(), json!(0));
    settings_engine::save_partial(sync_store.as_ref(), chosen, true).await;

    let host = MemoryHost::new();
    let background = Background::new(
        session_store,
        sync_store,
        Arc::clone(&host) as Arc<dyn tab_positioner::host::HostTabs>,
        Arc::clone(&host) as Arc<dyn tab_positioner::host::HostWindows>,
    )
    .await;
    host.set_dispatcher(Background::wire(&background));

    host.fire_installed().await;

    let window = host.create_window(WindowKind::Normal).await;
    let t1 = host.create_tab(window, Some("https://example.com/a"), true, None).await;
    let t2 = host.create_tab(window, Some("https://example.com/b"), false, None).await;
    let t3 = host.create_tab(window, Some("https://example.com/c"), false, None).await;
    host.activate_tab(t1).await;
    println!("window {} opened with tabs {:?}", window, host.tab_order(window));

    // A link opened in the foreground lands right after the active tab
    // instead of at the end of the strip.
    let t4 = host
        .create_tab(window, Some("https://example.com/d"), true, Some(t1))
        .await;
    println!(
        "foreground link {} placed after_active: {:?}",
        t4,
        host.tab_order(window)
    );

    // Closing the active tab hands focus to the tab on its left.
    host.close_tab(t4).await;
    println!(
        "closed {} -> before_removed activates {:?} (order {:?})",
        t4,
        host.active_tab(window),
        host.tab_order(window)
    );

    // A popup is merged into the recent normal window as a foreground tab.
    let (popup, p1) = host.open_popup(Some("https://example.com/popup")).await;
    println!(
        "popup tab {} merged: window order {:?}, popup window alive: {}",
        p1,
        host.tab_order(window),
        host.has_window(popup)
    );

    let _ = (t2, t3);
    println!();
    println!(
        "{} host moves, {} host activations issued",
        host.move_calls(),
        host.activate_calls()
    );
}
