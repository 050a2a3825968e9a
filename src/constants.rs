//! Engine-wide constants.

use crate::types::tab::{TabId, WindowId};

/// Delay before a scheduled checkpoint write starts; requests arriving inside
/// the window supersede the pending one.
pub const STATE_SAVE_DELAY_MS: u64 = 50;

/// Grace period before trusting the first activation after a cold start, and
/// before the post-move active-tab re-query.
pub const FIRST_ACTIVATION_DELAY_MS: u64 = 50;

/// Interval between keep-alive storage pings, well inside the host's
/// idle-shutdown horizon.
pub const KEEP_ALIVE_INTERVAL_SECS: u64 = 20;

/// Host sentinel for "no tab".
pub const TAB_ID_NONE: TabId = -1;

/// Sentinel for "no window recorded".
pub const NO_WINDOW_ID: WindowId = -1;

/// Host sentinel index meaning "last position in the window".
pub const LAST_INDEX: i64 = -1;

/// URLs a new-tab page can report; these select the new-tab placement
/// setting instead of the link placement settings.
pub const NEW_PAGE_URIS: &[&str] = &["about:newtab", "chrome://newtab/", "about:blank"];
