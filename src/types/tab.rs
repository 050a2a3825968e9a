use serde::{Deserialize, Serialize};

/// Host-assigned tab identifier. Negative values are sentinels.
pub type TabId = i64;

/// Host-assigned window identifier. Negative values are sentinels.
pub type WindowId = i64;

/// One open tab as known to the tracker.
///
/// `last_accessed_at` is a logical timestamp used only for recency ordering
/// within a window, not for wall-clock precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabRecord {
    pub id: TabId,
    pub window_id: WindowId,
    pub last_accessed_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opener_id: Option<TabId>,
}

/// Per window, the `{id, index}` of the last tab an activation event pointed
/// to. Only updated on explicit activation events, so it can lag behind the
/// host's true active tab until a re-synchronization query runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentTabInfo {
    pub id: TabId,
    pub index: i64,
}

impl RecentTabInfo {
    /// Sentinel returned when no activation has been observed for a window.
    pub const UNKNOWN: RecentTabInfo = RecentTabInfo { id: -1, index: -1 };
}

impl Default for RecentTabInfo {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

/// The single most recently removed tab, retained so a removal-triggered
/// handler can tell "the active tab was closed" from "a background tab was
/// closed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedTabInfo {
    pub id: TabId,
    pub window_id: WindowId,
}

impl RemovedTabInfo {
    pub const NONE: RemovedTabInfo = RemovedTabInfo {
        id: -1,
        window_id: -1,
    };
}

impl Default for RemovedTabInfo {
    fn default() -> Self {
        Self::NONE
    }
}

/// Opaque tab descriptor delivered by the host with lifecycle events and
/// query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabDescriptor {
    pub id: TabId,
    pub window_id: WindowId,
    /// Positional index within the window, as reported by the host.
    pub index: i64,
    pub active: bool,
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opener_id: Option<TabId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_url: Option<String>,
    pub last_accessed: u64,
}

/// Window kind as reported by the host. Only normal windows are tracked;
/// popup tabs are merged into a normal window by the popup policy handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowKind {
    Normal,
    Popup,
}

/// Window descriptor returned by populated window queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowDescriptor {
    pub id: WindowId,
    pub kind: WindowKind,
    pub focused: bool,
    pub tabs: Vec<TabDescriptor>,
}
