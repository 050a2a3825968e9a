use crate::types::tab::{TabDescriptor, TabId, WindowId};

/// Tab/window lifecycle events delivered by the host, as a tagged union.
///
/// Handlers registered for the same kind run strictly in registration order;
/// handlers for different kinds only have whatever ordering the host itself
/// guarantees (e.g. created fires before activated for the same tab).
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// Extension installed or updated.
    Installed,
    /// Browser session started.
    Startup,
    TabCreated(TabDescriptor),
    TabRemoved {
        tab_id: TabId,
        window_id: WindowId,
        is_window_closing: bool,
    },
    TabAttached {
        tab_id: TabId,
        window_id: WindowId,
    },
    TabDetached {
        tab_id: TabId,
        window_id: WindowId,
    },
    TabActivated {
        tab_id: TabId,
        window_id: WindowId,
    },
    /// Tab properties changed; only the pinned flag is consumed.
    TabUpdated {
        tab_id: TabId,
        window_id: WindowId,
        pinned: bool,
    },
    WindowFocusChanged {
        window_id: WindowId,
    },
    /// A popup window was created.
    PopupCreated {
        window_id: WindowId,
    },
    /// The user-synced settings area changed (options UI wrote to it).
    SettingsChanged,
}

/// Discriminant used as the registration key for event handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Installed,
    Startup,
    TabCreated,
    TabRemoved,
    TabAttached,
    TabDetached,
    TabActivated,
    TabUpdated,
    WindowFocusChanged,
    PopupCreated,
    SettingsChanged,
}

impl HostEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            HostEvent::Installed => EventKind::Installed,
            HostEvent::Startup => EventKind::Startup,
            HostEvent::TabCreated(_) => EventKind::TabCreated,
            HostEvent::TabRemoved { .. } => EventKind::TabRemoved,
            HostEvent::TabAttached { .. } => EventKind::TabAttached,
            HostEvent::TabDetached { .. } => EventKind::TabDetached,
            HostEvent::TabActivated { .. } => EventKind::TabActivated,
            HostEvent::TabUpdated { .. } => EventKind::TabUpdated,
            HostEvent::WindowFocusChanged { .. } => EventKind::WindowFocusChanged,
            HostEvent::PopupCreated { .. } => EventKind::PopupCreated,
            HostEvent::SettingsChanged => EventKind::SettingsChanged,
        }
    }
}
