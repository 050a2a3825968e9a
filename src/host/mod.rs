// Tab Positioner host interface boundary
// Abstract tab/window surface of the browser extension runtime. Any host
// providing an equivalent lifecycle API satisfies these traits; the engine
// only consumes queries and issues two mutations (move tab, set tab active).

pub mod memory;

use crate::types::errors::HostError;
use crate::types::tab::{TabDescriptor, TabId, WindowDescriptor, WindowId};
use crate::types::BoxFuture;

pub use memory::MemoryHost;

/// Filters for tab enumeration queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabQuery {
    pub window_id: Option<WindowId>,
    /// Positional index within the window.
    pub index: Option<i64>,
    pub active: Option<bool>,
    /// Restrict to normal (non-popup) windows.
    pub normal_only: bool,
}

impl TabQuery {
    /// All tabs in normal windows.
    pub fn normal_windows() -> Self {
        Self {
            normal_only: true,
            ..Self::default()
        }
    }

    /// The active tab of one window.
    pub fn active_in(window_id: WindowId) -> Self {
        Self {
            window_id: Some(window_id),
            active: Some(true),
            ..Self::default()
        }
    }

    /// The tab at a positional index in a normal window.
    pub fn at_index(window_id: WindowId, index: i64) -> Self {
        Self {
            window_id: Some(window_id),
            index: Some(index),
            normal_only: true,
            ..Self::default()
        }
    }
}

/// Host tab surface. Mutations are fire-and-forget from the tracker's
/// perspective; their failures (stale tab id racing a removal) are caught and
/// logged by callers, never propagated as a crash.
pub trait HostTabs: Send + Sync {
    fn query<'a>(&'a self, query: TabQuery)
        -> BoxFuture<'a, Result<Vec<TabDescriptor>, HostError>>;
    fn get<'a>(&'a self, tab_id: TabId) -> BoxFuture<'a, Result<TabDescriptor, HostError>>;
    /// Moves a tab to `index` (host sentinel `-1` = last), optionally into
    /// another window.
    fn move_tab<'a>(
        &'a self,
        tab_id: TabId,
        index: i64,
        window_id: Option<WindowId>,
    ) -> BoxFuture<'a, Result<(), HostError>>;
    fn activate<'a>(&'a self, tab_id: TabId) -> BoxFuture<'a, Result<(), HostError>>;
}

/// Host window surface.
pub trait HostWindows: Send + Sync {
    /// Returns a window with its tabs populated.
    fn get_populated<'a>(
        &'a self,
        window_id: WindowId,
    ) -> BoxFuture<'a, Result<WindowDescriptor, HostError>>;
}
