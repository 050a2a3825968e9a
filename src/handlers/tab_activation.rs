//! Close-activation policy handler.
//!
//! After the active tab is closed, decides which remaining tab to activate
//! instead of the host's default choice, and issues at most one host
//! activation call.

use std::sync::Arc;

use log::debug;

use crate::host::{HostTabs, TabQuery};
use crate::managers::tab_tracker::TabsInfo;
use crate::services::checkpoint::Checkpointed;
use crate::services::settings_engine::SyncSettings;
use crate::types::settings::TabActivationPosition;
use crate::types::tab::{TabId, WindowId};

/// Target index among the remaining tabs, computed against the recent tab's
/// last known index. `None` means the host's default activation stands.
pub fn activation_target_index(
    setting: TabActivationPosition,
    recent_index: i64,
    remaining: usize,
) -> Option<i64> {
    match setting {
        TabActivationPosition::Default => None,
        TabActivationPosition::BeforeRemoved => Some((recent_index - 1).max(0)),
        TabActivationPosition::AfterRemoved => Some(recent_index),
        TabActivationPosition::WindowFirst => Some(0),
        TabActivationPosition::WindowLast => Some(remaining as i64 - 1),
    }
}

/// Handles a tab-removed event.
///
/// Only acts when the removed tab was the window's recent (i.e. active) tab
/// and the removal is not part of a detected batch. If no tab exists at the
/// computed index the handler is a no-op — expected when the removed tab was
/// alone in its window.
pub async fn tab_removed_activater(
    host: &dyn HostTabs,
    tracker: &Arc<Checkpointed<TabsInfo>>,
    settings: &Arc<Checkpointed<SyncSettings>>,
    tab_id: TabId,
    window_id: WindowId,
) {
    // Snapshot phase: the tracker has already dropped the tab from its list,
    // but the recent info still names the removed tab; read it all before
    // the first await, ahead of the host's default activation settling.
    let (recent, delay, remaining) = tracker.with(|t| {
        (
            t.get_recent_tab(window_id),
            t.removal_delay(),
            t.get_current_tabs(window_id).len(),
        )
    });
    if tab_id != recent.id {
        // A background tab was removed; the active tab is unaffected.
        return;
    }
    let snapshot = settings.with(|s| s.get().clone());
    if delay < snapshot.removal_batch_threshold_ms {
        debug!(
            "tab {} removed {}ms after previous; batch, not reactivating",
            tab_id, delay
        );
        return;
    }
    if remaining == 0 {
        // Nothing left to activate; the host handles the window.
        return;
    }
    let Some(new_index) =
        activation_target_index(snapshot.after_close_activation, recent.index, remaining)
    else {
        return;
    };
    let found = match host.query(TabQuery::at_index(window_id, new_index)).await {
        Ok(tabs) => tabs,
        Err(e) => {
            debug!("index query failed for window {}: {}", window_id, e);
            return;
        }
    };
    let Some(target) = found.first() else {
        return;
    };
    if let Err(e) = host.activate(target.id).await {
        // Expected when the target closed in the meantime.
        debug!("activation failed for tab {}: {}", target.id, e);
    }
}
