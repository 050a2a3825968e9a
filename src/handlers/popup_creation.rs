//! Popup-merge policy handler.
//!
//! When configured, a freshly created popup window's tab is pulled into the
//! most recently focused normal window, placed by the foreground/background
//! link setting, and optionally activated.

use std::sync::Arc;

use log::debug;

use crate::handlers::tab_mover;
use crate::host::{HostTabs, HostWindows};
use crate::managers::tab_tracker::TabsInfo;
use crate::services::checkpoint::Checkpointed;
use crate::services::settings_engine::SyncSettings;
use crate::types::settings::PopupPosition;
use crate::types::tab::WindowId;

/// Handles a popup-created event.
pub async fn created_popup_mover(
    host_tabs: &dyn HostTabs,
    host_windows: &dyn HostWindows,
    tracker: &Arc<Checkpointed<TabsInfo>>,
    settings: &Arc<Checkpointed<SyncSettings>>,
    popup_window_id: WindowId,
) {
    let snapshot = settings.with(|s| s.get().clone());
    if snapshot.popup_position == PopupPosition::Default {
        return;
    }
    let (target_window, has_activated) =
        tracker.with(|t| (t.get_recent_window_id(), t.has_tab_activated()));
    // Re-query with tabs populated; the creation event's descriptor does not
    // reliably include them yet.
    let window = match host_windows.get_populated(popup_window_id).await {
        Ok(window) => window,
        Err(e) => {
            debug!("popup window {} query failed: {}", popup_window_id, e);
            return;
        }
    };
    let Some(new_tab) = window.tabs.first() else {
        return;
    };
    let creation_setting = match snapshot.popup_position {
        PopupPosition::NewForegroundTab => snapshot.foreground_link_position,
        PopupPosition::NewBackgroundTab => snapshot.background_link_position,
        PopupPosition::Default => return,
    };
    tab_mover::move_tab(
        host_tabs,
        tracker,
        new_tab.id,
        target_window,
        creation_setting,
        None,
        has_activated,
    )
    .await;
    if snapshot.popup_position == PopupPosition::NewForegroundTab {
        debug!("activating merged popup tab {}", new_tab.id);
        if let Err(e) = host_tabs.activate(new_tab.id).await {
            debug!("activation failed for tab {}: {}", new_tab.id, e);
        }
    }
}
