//! Tab-creation policy handler.
//!
//! Decides where a newly created tab should go, combining the tracker's
//! recent-tab snapshot with the user's placement settings, and issues at most
//! one host move call (through the shared tab mover).

use std::sync::Arc;

use log::debug;

use crate::constants::{NEW_PAGE_URIS, TAB_ID_NONE};
use crate::handlers::tab_mover;
use crate::host::HostTabs;
use crate::managers::tab_tracker::TabsInfo;
use crate::services::checkpoint::Checkpointed;
use crate::services::settings_engine::SyncSettings;
use crate::types::settings::{ExtensionSettings, TabCreationPosition};
use crate::types::tab::TabDescriptor;

/// Selects the placement setting that applies to a created tab: new-tab pages
/// use `new_tab_position`, tabs created active use `foreground_link_position`,
/// background tabs use `background_link_position`.
pub fn creation_setting(settings: &ExtensionSettings, tab: &TabDescriptor) -> TabCreationPosition {
    let url = tab
        .pending_url
        .as_deref()
        .or(tab.url.as_deref())
        .unwrap_or("");
    if NEW_PAGE_URIS.contains(&url) {
        settings.new_tab_position
    } else if tab.active {
        settings.foreground_link_position
    } else {
        settings.background_link_position
    }
}

/// Handles a tab-created event.
///
/// Skips entirely when the creation is part of a detected batch (session
/// restore, "open all bookmarks") — repositioning a flood of restored tabs
/// one-by-one produces visibly wrong, flickering results — and when the new
/// tab is its window's only tab, which is popup-merge territory.
pub async fn created_tab_mover(
    host: &dyn HostTabs,
    tracker: &Arc<Checkpointed<TabsInfo>>,
    settings: &Arc<Checkpointed<SyncSettings>>,
    new_tab: TabDescriptor,
) {
    if new_tab.id == TAB_ID_NONE {
        return;
    }
    // Snapshot phase: the tracker's own created-handler has already run for
    // this event, so its state includes the new tab; read everything before
    // the first await.
    let (delay, window_tab_count, has_activated) = tracker.with(|t| {
        (
            t.creation_delay(),
            t.get_current_tabs(new_tab.window_id).len(),
            t.has_tab_activated(),
        )
    });
    let snapshot = settings.with(|s| s.get().clone());
    if delay < snapshot.creation_batch_threshold_ms {
        debug!(
            "tab {} created {}ms after previous; batch, not repositioning",
            new_tab.id, delay
        );
        return;
    }
    if window_tab_count <= 1 {
        debug!("tab {} is alone in window {}", new_tab.id, new_tab.window_id);
        return;
    }
    let setting = creation_setting(&snapshot, &new_tab);
    if setting == TabCreationPosition::Default {
        return;
    }
    tab_mover::move_tab(
        host,
        tracker,
        new_tab.id,
        new_tab.window_id,
        setting,
        Some(new_tab.index),
        has_activated,
    )
    .await;
}
