//! In-memory host.
//!
//! A minimal stand-in for the browser's tab/window surface: keeps true
//! positional order and the active tab per window, answers the query traits,
//! and feeds lifecycle events through a registered [`Dispatcher`] in the
//! host's documented order (created before activated, removed before the
//! default activation, detach before attach).
//!
//! Events are queued and drained by a single pump loop; a mutation performed
//! from inside a handler enqueues its events and lets the outer pump deliver
//! them, which models the host's one-callback-at-a-time event loop.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::events::Dispatcher;
use crate::types::errors::HostError;
use crate::types::events::HostEvent;
use crate::types::tab::{
    TabDescriptor, TabId, WindowDescriptor, WindowId, WindowKind,
};
use crate::types::BoxFuture;

use super::{HostTabs, HostWindows, TabQuery};

#[derive(Debug, Clone)]
struct TabState {
    id: TabId,
    window_id: WindowId,
    pinned: bool,
    opener_id: Option<TabId>,
    url: Option<String>,
    pending_url: Option<String>,
    last_accessed: u64,
}

#[derive(Debug, Clone)]
struct WindowState {
    id: WindowId,
    kind: WindowKind,
    // Positional order.
    tabs: Vec<TabId>,
    active: Option<TabId>,
    focused: bool,
}

#[derive(Default)]
struct HostState {
    windows: BTreeMap<WindowId, WindowState>,
    tabs: BTreeMap<TabId, TabState>,
}

pub struct MemoryHost {
    state: Mutex<HostState>,
    dispatcher: Mutex<Option<Arc<Dispatcher>>>,
    queue: Mutex<VecDeque<HostEvent>>,
    pump_lock: tokio::sync::Mutex<()>,
    next_window_id: AtomicI64,
    next_tab_id: AtomicI64,
    move_calls: AtomicUsize,
    activate_calls: AtomicUsize,
}

impl MemoryHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(HostState::default()),
            dispatcher: Mutex::new(None),
            queue: Mutex::new(VecDeque::new()),
            pump_lock: tokio::sync::Mutex::new(()),
            next_window_id: AtomicI64::new(1),
            next_tab_id: AtomicI64::new(1),
            move_calls: AtomicUsize::new(0),
            activate_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_dispatcher(&self, dispatcher: Arc<Dispatcher>) {
        *lock(&self.dispatcher) = Some(dispatcher);
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn emit(&self, event: HostEvent) {
        lock(&self.queue).push_back(event);
    }

    /// Drains the event queue through the dispatcher. Re-entrant calls (a
    /// handler mutating the host mid-delivery) return immediately; the outer
    /// pump picks up whatever they enqueued.
    pub async fn pump(&self) {
        let Ok(_guard) = self.pump_lock.try_lock() else {
            return;
        };
        loop {
            let event = lock(&self.queue).pop_front();
            let Some(event) = event else {
                break;
            };
            let dispatcher = lock(&self.dispatcher).clone();
            if let Some(dispatcher) = dispatcher {
                dispatcher.dispatch(event).await;
            }
        }
    }

    // === User-level operations (what the person at the browser does) ===

    pub async fn fire_installed(&self) {
        self.emit(HostEvent::Installed);
        self.pump().await;
    }

    pub async fn fire_startup(&self) {
        self.emit(HostEvent::Startup);
        self.pump().await;
    }

    pub async fn notify_settings_changed(&self) {
        self.emit(HostEvent::SettingsChanged);
        self.pump().await;
    }

    pub async fn create_window(&self, kind: WindowKind) -> WindowId {
        let id = self.next_window_id.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = lock(&self.state);
            for window in state.windows.values_mut() {
                window.focused = false;
            }
            state.windows.insert(
                id,
                WindowState {
                    id,
                    kind,
                    tabs: Vec::new(),
                    active: None,
                    focused: true,
                },
            );
        }
        if kind == WindowKind::Popup {
            self.emit(HostEvent::PopupCreated { window_id: id });
        }
        self.emit(HostEvent::WindowFocusChanged { window_id: id });
        self.pump().await;
        id
    }

    pub async fn create_tab(
        &self,
        window_id: WindowId,
        url: Option<&str>,
        active: bool,
        opener_id: Option<TabId>,
    ) -> TabId {
        let id = self.next_tab_id.fetch_add(1, Ordering::SeqCst);
        let mut activated = false;
        let descriptor = {
            let mut state = lock(&self.state);
            let now = Self::now();
            state.tabs.insert(
                id,
                TabState {
                    id,
                    window_id,
                    pinned: false,
                    opener_id,
                    url: url.map(str::to_string),
                    pending_url: None,
                    last_accessed: now,
                },
            );
            let Some(window) = state.windows.get_mut(&window_id) else {
                return id;
            };
            window.tabs.push(id);
            let first_tab = window.tabs.len() == 1;
            if active || first_tab {
                window.active = Some(id);
                activated = true;
            }
            let index = window.tabs.len() as i64 - 1;
            TabDescriptor {
                id,
                window_id,
                index,
                active: activated,
                pinned: false,
                opener_id,
                url: url.map(str::to_string),
                pending_url: None,
                last_accessed: now,
            }
        };
        self.emit(HostEvent::TabCreated(descriptor));
        if activated {
            self.emit(HostEvent::TabActivated {
                tab_id: id,
                window_id,
            });
        }
        self.pump().await;
        id
    }

    /// Opens a popup window with its single tab, the way hosts create popups
    /// atomically. Event order matches the host's: the tab's created event
    /// fires before the window's popup-created event.
    pub async fn open_popup(&self, url: Option<&str>) -> (WindowId, TabId) {
        let window_id = self.next_window_id.fetch_add(1, Ordering::SeqCst);
        let tab_id = self.next_tab_id.fetch_add(1, Ordering::SeqCst);
        let descriptor = {
            let mut state = lock(&self.state);
            for window in state.windows.values_mut() {
                window.focused = false;
            }
            let now = Self::now();
            state.tabs.insert(
                tab_id,
                TabState {
                    id: tab_id,
                    window_id,
                    pinned: false,
                    opener_id: None,
                    url: url.map(str::to_string),
                    pending_url: None,
                    last_accessed: now,
                },
            );
            state.windows.insert(
                window_id,
                WindowState {
                    id: window_id,
                    kind: WindowKind::Popup,
                    tabs: vec![tab_id],
                    active: Some(tab_id),
                    focused: true,
                },
            );
            TabDescriptor {
                id: tab_id,
                window_id,
                index: 0,
                active: true,
                pinned: false,
                opener_id: None,
                url: url.map(str::to_string),
                pending_url: None,
                last_accessed: now,
            }
        };
        self.emit(HostEvent::TabCreated(descriptor));
        self.emit(HostEvent::PopupCreated { window_id });
        self.emit(HostEvent::TabActivated {
            tab_id,
            window_id,
        });
        self.emit(HostEvent::WindowFocusChanged { window_id });
        self.pump().await;
        (window_id, tab_id)
    }

    /// Closes a tab. If it was the active one, the host's default behavior
    /// activates the tab now occupying its slot (or the new last tab).
    pub async fn close_tab(&self, tab_id: TabId) {
        let mut events = Vec::new();
        {
            let mut state = lock(&self.state);
            let Some(tab) = state.tabs.remove(&tab_id) else {
                return;
            };
            let window_id = tab.window_id;
            let Some(window) = state.windows.get_mut(&window_id) else {
                return;
            };
            let Some(pos) = window.tabs.iter().position(|id| *id == tab_id) else {
                return;
            };
            window.tabs.remove(pos);
            let was_active = window.active == Some(tab_id);
            let closing = window.tabs.is_empty();
            events.push(HostEvent::TabRemoved {
                tab_id,
                window_id,
                is_window_closing: closing,
            });
            if closing {
                state.windows.remove(&window_id);
            } else if was_active {
                let neighbor = window.tabs[pos.min(window.tabs.len() - 1)];
                window.active = Some(neighbor);
                events.push(HostEvent::TabActivated {
                    tab_id: neighbor,
                    window_id,
                });
            }
        }
        for event in events {
            self.emit(event);
        }
        self.pump().await;
    }

    pub async fn activate_tab(&self, tab_id: TabId) {
        let window_id = {
            let mut state = lock(&self.state);
            let Some(tab) = state.tabs.get_mut(&tab_id) else {
                return;
            };
            tab.last_accessed = Self::now();
            let window_id = tab.window_id;
            if let Some(window) = state.windows.get_mut(&window_id) {
                window.active = Some(tab_id);
            }
            window_id
        };
        self.emit(HostEvent::TabActivated { tab_id, window_id });
        self.pump().await;
    }

    /// Drags a tab out of its window into another, emitting the
    /// detach/attach pair the host fires for cross-window moves.
    pub async fn transfer_tab(&self, tab_id: TabId, to_window: WindowId) {
        let result = {
            let mut state = lock(&self.state);
            self.reparent(&mut state, tab_id, to_window, -1)
        };
        if let Some((from_window, _)) = result {
            self.emit(HostEvent::TabDetached {
                tab_id,
                window_id: from_window,
            });
            self.emit(HostEvent::TabAttached {
                tab_id,
                window_id: to_window,
            });
        }
        self.pump().await;
    }

    pub async fn set_pinned(&self, tab_id: TabId, pinned: bool) {
        let window_id = {
            let mut state = lock(&self.state);
            let Some(tab) = state.tabs.get_mut(&tab_id) else {
                return;
            };
            tab.pinned = pinned;
            tab.window_id
        };
        self.emit(HostEvent::TabUpdated {
            tab_id,
            window_id,
            pinned,
        });
        self.pump().await;
    }

    // === Inspection (for tests and the demo binary) ===

    /// Positional tab order of a window.
    pub fn tab_order(&self, window_id: WindowId) -> Vec<TabId> {
        lock(&self.state)
            .windows
            .get(&window_id)
            .map(|w| w.tabs.clone())
            .unwrap_or_default()
    }

    pub fn active_tab(&self, window_id: WindowId) -> Option<TabId> {
        lock(&self.state)
            .windows
            .get(&window_id)
            .and_then(|w| w.active)
    }

    pub fn has_window(&self, window_id: WindowId) -> bool {
        lock(&self.state).windows.contains_key(&window_id)
    }

    /// Number of `move_tab` host calls issued so far.
    pub fn move_calls(&self) -> usize {
        self.move_calls.load(Ordering::SeqCst)
    }

    pub fn activate_calls(&self) -> usize {
        self.activate_calls.load(Ordering::SeqCst)
    }

    // === Internals ===

    fn descriptor(state: &HostState, tab: &TabState) -> TabDescriptor {
        let (index, active) = state
            .windows
            .get(&tab.window_id)
            .map(|window| {
                let index = window
                    .tabs
                    .iter()
                    .position(|id| *id == tab.id)
                    .map_or(-1, |p| p as i64);
                (index, window.active == Some(tab.id))
            })
            .unwrap_or((-1, false));
        TabDescriptor {
            id: tab.id,
            window_id: tab.window_id,
            index,
            active,
            pinned: tab.pinned,
            opener_id: tab.opener_id,
            url: tab.url.clone(),
            pending_url: tab.pending_url.clone(),
            last_accessed: tab.last_accessed,
        }
    }

    /// Moves a tab into `to_window` at `index` (`-1` = last). Returns the
    /// source window and whether it emptied. An emptied source window is
    /// deleted without a removal event, mirroring the host's detach quirk.
    fn reparent(
        &self,
        state: &mut HostState,
        tab_id: TabId,
        to_window: WindowId,
        index: i64,
    ) -> Option<(WindowId, bool)> {
        let from_window = state.tabs.get(&tab_id)?.window_id;
        if !state.windows.contains_key(&to_window) {
            return None;
        }
        let emptied = {
            let window = state.windows.get_mut(&from_window)?;
            let pos = window.tabs.iter().position(|id| *id == tab_id)?;
            window.tabs.remove(pos);
            if window.active == Some(tab_id) {
                window.active = window.tabs.first().copied();
            }
            window.tabs.is_empty()
        };
        if emptied {
            state.windows.remove(&from_window);
        }
        if let Some(tab) = state.tabs.get_mut(&tab_id) {
            tab.window_id = to_window;
        }
        if let Some(window) = state.windows.get_mut(&to_window) {
            let len = window.tabs.len() as i64;
            let pos = if index < 0 || index > len {
                len as usize
            } else {
                index as usize
            };
            window.tabs.insert(pos, tab_id);
        }
        Some((from_window, emptied))
    }
}

impl HostTabs for MemoryHost {
    fn query<'a>(
        &'a self,
        query: TabQuery,
    ) -> BoxFuture<'a, Result<Vec<TabDescriptor>, HostError>> {
        let result = {
            let state = lock(&self.state);
            let mut found = Vec::new();
            for window in state.windows.values() {
                if query.normal_only && window.kind != WindowKind::Normal {
                    continue;
                }
                if let Some(window_id) = query.window_id {
                    if window.id != window_id {
                        continue;
                    }
                }
                for tab_id in &window.tabs {
                    let Some(tab) = state.tabs.get(tab_id) else {
                        continue;
                    };
                    let descriptor = Self::descriptor(&state, tab);
                    if let Some(index) = query.index {
                        if descriptor.index != index {
                            continue;
                        }
                    }
                    if let Some(active) = query.active {
                        if descriptor.active != active {
                            continue;
                        }
                    }
                    found.push(descriptor);
                }
            }
            Ok(found)
        };
        Box::pin(async move { result })
    }

    fn get<'a>(&'a self, tab_id: TabId) -> BoxFuture<'a, Result<TabDescriptor, HostError>> {
        let result = {
            let state = lock(&self.state);
            state
                .tabs
                .get(&tab_id)
                .map(|tab| Self::descriptor(&state, tab))
                .ok_or(HostError::NoSuchTab(tab_id))
        };
        Box::pin(async move { result })
    }

    fn move_tab<'a>(
        &'a self,
        tab_id: TabId,
        index: i64,
        window_id: Option<WindowId>,
    ) -> BoxFuture<'a, Result<(), HostError>> {
        Box::pin(async move {
            self.move_calls.fetch_add(1, Ordering::SeqCst);
            let cross_window = {
                let mut state = lock(&self.state);
                let Some(tab) = state.tabs.get(&tab_id) else {
                    return Err(HostError::NoSuchTab(tab_id));
                };
                let from_window = tab.window_id;
                let to_window = window_id.unwrap_or(from_window);
                if to_window != from_window {
                    if self.reparent(&mut state, tab_id, to_window, index).is_none() {
                        return Err(HostError::NoSuchWindow(to_window));
                    }
                    Some((from_window, to_window))
                } else {
                    let Some(window) = state.windows.get_mut(&from_window) else {
                        return Err(HostError::NoSuchWindow(from_window));
                    };
                    let Some(pos) = window.tabs.iter().position(|id| *id == tab_id) else {
                        return Err(HostError::NoSuchTab(tab_id));
                    };
                    window.tabs.remove(pos);
                    let len = window.tabs.len() as i64;
                    let target = if index < 0 || index > len {
                        len as usize
                    } else {
                        index as usize
                    };
                    window.tabs.insert(target, tab_id);
                    None
                }
            };
            if let Some((from_window, to_window)) = cross_window {
                self.emit(HostEvent::TabDetached {
                    tab_id,
                    window_id: from_window,
                });
                self.emit(HostEvent::TabAttached {
                    tab_id,
                    window_id: to_window,
                });
            }
            self.pump().await;
            Ok(())
        })
    }

    fn activate<'a>(&'a self, tab_id: TabId) -> BoxFuture<'a, Result<(), HostError>> {
        Box::pin(async move {
            self.activate_calls.fetch_add(1, Ordering::SeqCst);
            let window_id = {
                let mut state = lock(&self.state);
                let Some(tab) = state.tabs.get_mut(&tab_id) else {
                    return Err(HostError::NoSuchTab(tab_id));
                };
                tab.last_accessed = Self::now();
                let window_id = tab.window_id;
                if let Some(window) = state.windows.get_mut(&window_id) {
                    window.active = Some(tab_id);
                }
                window_id
            };
            self.emit(HostEvent::TabActivated { tab_id, window_id });
            self.pump().await;
            Ok(())
        })
    }
}

impl HostWindows for MemoryHost {
    fn get_populated<'a>(
        &'a self,
        window_id: WindowId,
    ) -> BoxFuture<'a, Result<WindowDescriptor, HostError>> {
        let result = {
            let state = lock(&self.state);
            state
                .windows
                .get(&window_id)
                .map(|window| WindowDescriptor {
                    id: window.id,
                    kind: window.kind,
                    focused: window.focused,
                    tabs: window
                        .tabs
                        .iter()
                        .filter_map(|id| state.tabs.get(id))
                        .map(|tab| Self::descriptor(&state, tab))
                        .collect(),
                })
                .ok_or(HostError::NoSuchWindow(window_id))
        };
        Box::pin(async move { result })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
