use serde::{Deserialize, Serialize};

/// Where a newly created tab should be placed relative to the window's
/// recently active tab. `Default` leaves the host's placement untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabCreationPosition {
    Default,
    BeforeActive,
    AfterActive,
    WindowFirst,
    WindowLast,
}

impl Default for TabCreationPosition {
    fn default() -> Self {
        TabCreationPosition::Default
    }
}

/// Which tab should be activated after the active tab is closed.
/// `Default` leaves the host's activation behavior untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabActivationPosition {
    Default,
    BeforeRemoved,
    AfterRemoved,
    WindowFirst,
    WindowLast,
}

impl Default for TabActivationPosition {
    fn default() -> Self {
        TabActivationPosition::Default
    }
}

/// How popup windows are handled: left alone, or merged into the most recent
/// normal window as a foreground or background tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopupPosition {
    Default,
    NewForegroundTab,
    NewBackgroundTab,
}

impl Default for PopupPosition {
    fn default() -> Self {
        PopupPosition::Default
    }
}

/// User-configurable policy values. Flat key set; each key has a fixed type
/// (`boolean` | `number` | `choices`) declared by the setting schema in the
/// settings engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionSettings {
    pub new_tab_position: TabCreationPosition,
    pub foreground_link_position: TabCreationPosition,
    pub background_link_position: TabCreationPosition,
    pub after_close_activation: TabActivationPosition,
    pub popup_position: PopupPosition,
    /// Creation events closer together than this are treated as one batch.
    pub creation_batch_threshold_ms: u64,
    /// Removal events closer together than this are treated as one batch.
    pub removal_batch_threshold_ms: u64,
    /// Keep the background context alive with periodic storage pings.
    pub persistent_background: bool,
}

impl Default for ExtensionSettings {
    fn default() -> Self {
        Self {
            new_tab_position: TabCreationPosition::Default,
            foreground_link_position: TabCreationPosition::Default,
            background_link_position: TabCreationPosition::Default,
            after_close_activation: TabActivationPosition::Default,
            popup_position: PopupPosition::Default,
            creation_batch_threshold_ms: 100,
            removal_batch_threshold_ms: 100,
            persistent_background: false,
        }
    }
}
