//! Tab-state tracker.
//!
//! The authoritative in-memory (checkpointed) projection of the tab/window
//! topology, built purely from the host's event stream: per-window tab lists
//! in recency order, the most recently activated tab per window, the most
//! recently removed tab, and batch-detection timers for creation/removal
//! bursts.
//!
//! Every mutation tolerates unknown windows and tabs as silent no-ops:
//! tracking drift must never panic, because these methods run inside host
//! event callbacks where a failure would desynchronize the tracker from
//! reality for the rest of the session.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::constants::{FIRST_ACTIVATION_DELAY_MS, NO_WINDOW_ID, TAB_ID_NONE};
use crate::host::{HostTabs, TabQuery};
use crate::services::checkpoint::{CheckpointName, Checkpointed};
use crate::types::tab::{
    RecentTabInfo, RemovedTabInfo, TabDescriptor, TabId, TabRecord, WindowId,
};

/// Tracker state. Plain data; checkpointed field-by-field by
/// [`Checkpointed`].
///
/// Per-window lists are kept in recency order, most recently accessed first
/// (the chosen convention — positional order would require a full host
/// re-query per event, which is deliberately avoided).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabsInfo {
    windows: BTreeMap<WindowId, Vec<TabRecord>>,
    recent: BTreeMap<WindowId, RecentTabInfo>,
    recent_window_id: WindowId,
    removed: RemovedTabInfo,
    previous_created_at: u64,
    last_created_at: u64,
    previous_removed_at: u64,
    last_removed_at: u64,
    has_activated: bool,
    // Derived: whether the first-activation grace period has run. Not
    // checkpointed; the grace applies at most once per in-memory lifetime.
    #[serde(skip)]
    grace_applied: bool,
}

impl Default for TabsInfo {
    fn default() -> Self {
        Self {
            windows: BTreeMap::new(),
            recent: BTreeMap::new(),
            recent_window_id: NO_WINDOW_ID,
            removed: RemovedTabInfo::NONE,
            previous_created_at: 0,
            last_created_at: 0,
            previous_removed_at: 0,
            last_removed_at: 0,
            has_activated: false,
            grace_applied: false,
        }
    }
}

impl CheckpointName for TabsInfo {
    const NAME: &'static str = "TabsInfo";
}

impl TabsInfo {
    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// Rebuilds every window's list and recent-tab info from a full
    /// enumeration of open tabs. Tabs are processed oldest-accessed first so
    /// the last processed active tab per window wins — multiple tabs in the
    /// enumeration may claim "active" inconsistently during host races, and
    /// last-write-wins by processing order is the defined tie-break.
    pub fn initialize(&mut self, tabs: &[TabDescriptor]) {
        self.windows.clear();
        self.recent.clear();
        let mut ordered: Vec<&TabDescriptor> = tabs.iter().collect();
        ordered.sort_by_key(|tab| tab.last_accessed);
        for tab in ordered {
            if tab.id == TAB_ID_NONE {
                continue;
            }
            self.windows.entry(tab.window_id).or_default().insert(
                0,
                TabRecord {
                    id: tab.id,
                    window_id: tab.window_id,
                    last_accessed_at: tab.last_accessed,
                    opener_id: tab.opener_id,
                },
            );
            if tab.active {
                self.recent.insert(
                    tab.window_id,
                    RecentTabInfo {
                        id: tab.id,
                        index: tab.index,
                    },
                );
                self.recent_window_id = tab.window_id;
            }
        }
    }

    /// Appends a new tab to its window's list (creating the window entry if
    /// absent) and records the creation batch-timer delta.
    pub fn add_tab(&mut self, window_id: WindowId, tab_id: TabId, opener_id: Option<TabId>) {
        if tab_id == TAB_ID_NONE {
            return;
        }
        let now = Self::now();
        self.previous_created_at = self.last_created_at;
        self.last_created_at = now;
        self.windows.entry(window_id).or_default().insert(
            0,
            TabRecord {
                id: tab_id,
                window_id,
                last_accessed_at: now,
                opener_id,
            },
        );
    }

    /// Records the removal, updates the removal batch timers, and drops the
    /// tab from its window's list. When the window is closing, or this was
    /// its last tab, the window's list and recent info are deleted entirely:
    /// detaching the last tab of a window fires no symmetric removal event,
    /// so the list emptying is the only reliable signal.
    pub fn remove_tab(&mut self, window_id: WindowId, tab_id: TabId, is_window_closing: bool) {
        let Some(list) = self.windows.get_mut(&window_id) else {
            return;
        };
        self.previous_removed_at = self.last_removed_at;
        self.last_removed_at = Self::now();
        self.removed = RemovedTabInfo {
            id: tab_id,
            window_id,
        };
        list.retain(|record| record.id != tab_id);
        if is_window_closing || list.is_empty() {
            self.windows.remove(&window_id);
            self.recent.remove(&window_id);
        }
    }

    /// Refreshes the tab's recency, moves it to the front of its window's
    /// list, and records it as the window's recent tab. Does not touch the
    /// recent window; that follows focus changes, filtered to normal windows,
    /// so a popup activation cannot become the reposition target.
    pub fn activate_tab(&mut self, window_id: WindowId, tab_id: TabId, index: i64) {
        let Some(list) = self.windows.get_mut(&window_id) else {
            return;
        };
        if let Some(pos) = list.iter().position(|record| record.id == tab_id) {
            let mut record = list.remove(pos);
            record.last_accessed_at = Self::now();
            list.insert(0, record);
        }
        self.recent
            .insert(window_id, RecentTabInfo { id: tab_id, index });
        self.has_activated = true;
    }

    /// Records the most recently focused normal window.
    pub fn set_recent_window(&mut self, window_id: WindowId) {
        self.recent_window_id = window_id;
    }

    /// The window's tabs, most recently accessed first.
    pub fn get_current_tabs(&self, window_id: WindowId) -> Vec<TabRecord> {
        self.windows.get(&window_id).cloned().unwrap_or_default()
    }

    /// The last tab an activation event reported for this window, or the
    /// `{-1, -1}` sentinel when unknown.
    pub fn get_recent_tab(&self, window_id: WindowId) -> RecentTabInfo {
        self.recent
            .get(&window_id)
            .copied()
            .unwrap_or(RecentTabInfo::UNKNOWN)
    }

    pub fn get_recent_window_id(&self) -> WindowId {
        self.recent_window_id
    }

    pub fn get_removed_tab(&self) -> RemovedTabInfo {
        self.removed
    }

    /// Delay between the two most recent creation events, in milliseconds.
    /// `u64::MAX` until two creations have been seen.
    pub fn creation_delay(&self) -> u64 {
        if self.previous_created_at == 0 {
            u64::MAX
        } else {
            self.last_created_at
                .saturating_sub(self.previous_created_at)
        }
    }

    /// Delay between the two most recent removal events, in milliseconds.
    /// `u64::MAX` until two removals have been seen.
    pub fn removal_delay(&self) -> u64 {
        if self.previous_removed_at == 0 {
            u64::MAX
        } else {
            self.last_removed_at
                .saturating_sub(self.previous_removed_at)
        }
    }

    pub fn find_window_containing(&self, tab_id: TabId) -> Option<WindowId> {
        self.windows
            .iter()
            .find(|(_, list)| list.iter().any(|record| record.id == tab_id))
            .map(|(window_id, _)| *window_id)
    }

    /// Whether a trusted activation has been observed this session. Used to
    /// paper over the host quirk where a freshly created tab reports as
    /// erroneously active right after a restart.
    pub fn has_tab_activated(&self) -> bool {
        self.has_activated
    }

    /// True when no window is tracked yet (fresh state, no checkpoint).
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Rebuilds the tracker from a full host enumeration. Only runs on a true
/// cold boot: a restored checkpoint wins over re-enumeration.
pub async fn initialize_from_host(tracker: &Arc<Checkpointed<TabsInfo>>, host: &dyn HostTabs) {
    if tracker.with(|t| !t.is_empty()) {
        debug!("TabsInfo: checkpoint present, skipping enumeration");
        return;
    }
    match host.query(TabQuery::normal_windows()).await {
        Ok(tabs) => {
            tracker.with_mut(|t| t.initialize(&tabs));
            Checkpointed::schedule_save(tracker);
        }
        Err(e) => warn!("tab enumeration failed: {}", e),
    }
}

/// Handles an activation event.
///
/// The first activation of each in-memory lifetime is not trusted
/// immediately: right after a cold start the host may report a spuriously
/// active tab before the true active tab settles, so the tracker waits a
/// short grace period and re-queries. The gate is the non-persisted
/// `grace_applied` flag, not the checkpointed activation history — a
/// restored checkpoint must not skip the grace, since the spurious report
/// happens on every cold start.
pub async fn on_tab_activated(
    tracker: &Arc<Checkpointed<TabsInfo>>,
    host: &dyn HostTabs,
    tab_id: TabId,
    window_id: WindowId,
) {
    if tab_id == TAB_ID_NONE {
        return;
    }
    let grace = tracker.with_mut(|t| {
        if !t.grace_applied {
            t.grace_applied = true;
            true
        } else {
            false
        }
    });
    if grace {
        sleep(Duration::from_millis(FIRST_ACTIVATION_DELAY_MS)).await;
        match host.query(TabQuery::active_in(window_id)).await {
            Ok(tabs) => {
                if let Some(tab) = tabs.first() {
                    tracker.with_mut(|t| t.activate_tab(window_id, tab.id, tab.index));
                }
            }
            Err(e) => debug!("active-tab re-query failed for window {}: {}", window_id, e),
        }
    } else {
        match host.get(tab_id).await {
            Ok(tab) => tracker.with_mut(|t| t.activate_tab(window_id, tab_id, tab.index)),
            // Tab already gone; expected race with a removal.
            Err(e) => debug!("activation for vanished tab {}: {}", tab_id, e),
        }
    }
    Checkpointed::schedule_save(tracker);
}

/// Re-synchronizes a window's recent-tab info from the host.
///
/// Pinning a tab moves it and can change focus without firing an activation
/// event, leaving the tracker's recent info stale until this runs.
pub async fn resync_recent_tab(
    tracker: &Arc<Checkpointed<TabsInfo>>,
    host: &dyn HostTabs,
    window_id: WindowId,
) {
    match host.query(TabQuery::active_in(window_id)).await {
        Ok(tabs) => {
            if let Some(tab) = tabs.first() {
                tracker.with_mut(|t| t.activate_tab(window_id, tab.id, tab.index));
                Checkpointed::schedule_save(tracker);
            }
        }
        Err(e) => debug!("recent-tab resync failed for window {}: {}", window_id, e),
    }
}
