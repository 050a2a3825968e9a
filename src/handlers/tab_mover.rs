//! Shared placement core for the creation and popup policy handlers.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::time::sleep;

use crate::constants::{FIRST_ACTIVATION_DELAY_MS, LAST_INDEX, NO_WINDOW_ID};
use crate::host::{HostTabs, TabQuery};
use crate::managers::tab_tracker::TabsInfo;
use crate::services::checkpoint::Checkpointed;
use crate::types::settings::TabCreationPosition;
use crate::types::tab::{TabId, WindowId};

/// Target index for a created tab, computed against the window's recent tab.
/// `None` means the host's default placement stands. A recent index of `-1`
/// (unknown) flows through unchanged: the host treats `-1` as "last", which
/// is the safe fallback.
pub fn target_index(setting: TabCreationPosition, recent_index: i64) -> Option<i64> {
    match setting {
        TabCreationPosition::Default => None,
        TabCreationPosition::BeforeActive => Some(recent_index),
        TabCreationPosition::AfterActive => Some(recent_index + 1),
        TabCreationPosition::WindowFirst => Some(0),
        TabCreationPosition::WindowLast => Some(LAST_INDEX),
    }
}

/// Moves one tab according to a placement setting, reading the recent-tab
/// snapshot before the first await. When no trusted activation has been seen
/// yet (`has_activated` false), the move is followed by a grace-period
/// re-query: if the moved tab settled as the active one, the tracker records
/// the activation it would otherwise have mistrusted.
pub async fn move_tab(
    host: &dyn HostTabs,
    tracker: &Arc<Checkpointed<TabsInfo>>,
    tab_id: TabId,
    window_id: WindowId,
    setting: TabCreationPosition,
    current_index: Option<i64>,
    has_activated: bool,
) {
    // Snapshot phase: read before any await; the host may mutate state
    // during suspension.
    let recent_index = tracker.with(|t| t.get_recent_tab(window_id)).index;
    let Some(new_index) = target_index(setting, recent_index) else {
        return;
    };
    if current_index == Some(new_index) {
        return;
    }
    debug!("moving tab {} to index {}", tab_id, new_index);
    let target_window = if window_id == NO_WINDOW_ID {
        None
    } else {
        Some(window_id)
    };
    if let Err(e) = host.move_tab(tab_id, new_index, target_window).await {
        // Expected when the tab closed between decision and action.
        debug!("move failed for tab {}: {}", tab_id, e);
        return;
    }
    if !has_activated {
        sleep(Duration::from_millis(FIRST_ACTIVATION_DELAY_MS)).await;
        match host.query(TabQuery::active_in(window_id)).await {
            Ok(tabs) => {
                if let Some(tab) = tabs.first() {
                    if tab.id == tab_id {
                        tracker.with_mut(|t| t.activate_tab(window_id, tab_id, tab.index));
                        Checkpointed::schedule_save(tracker);
                    }
                }
            }
            Err(e) => debug!("post-move active query failed: {}", e),
        }
    }
}
