//! Background core for Tab Positioner.
//!
//! Central struct holding the stores, the checkpointed tracker and settings
//! cache, and the host handles, and wiring them into an event dispatcher.
//!
//! Registration order is load-bearing: lifecycle/settings handlers first,
//! then the tracker handlers, then the policy handlers, so that for any one
//! event the tracker has already absorbed it by the time a policy reads the
//! tracked state.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::constants::KEEP_ALIVE_INTERVAL_SECS;
use crate::events::{Dispatcher, Listeners};
use crate::handlers::{popup_creation, tab_activation, tab_creation};
use crate::host::{HostTabs, HostWindows};
use crate::managers::tab_tracker::{
    self, initialize_from_host, on_tab_activated, resync_recent_tab,
};
use crate::services::checkpoint::Checkpointed;
use crate::services::settings_engine::{refresh_settings, SyncSettings};
use crate::storage::KeyValueStore;
use crate::types::events::{EventKind, HostEvent};
use crate::types::tab::WindowKind;

/// Central background struct holding the stores, tracked state, and host
/// handles.
pub struct Background {
    session_store: Arc<dyn KeyValueStore>,
    sync_store: Arc<dyn KeyValueStore>,
    host_tabs: Arc<dyn HostTabs>,
    host_windows: Arc<dyn HostWindows>,
    tracker: Arc<Checkpointed<tab_tracker::TabsInfo>>,
    settings: Arc<Checkpointed<SyncSettings>>,
    keep_alive: Mutex<Option<JoinHandle<()>>>,
}

impl Background {
    /// Creates the background core, restoring the tracker and settings cache
    /// from their session checkpoints when present.
    pub async fn new(
        session_store: Arc<dyn KeyValueStore>,
        sync_store: Arc<dyn KeyValueStore>,
        host_tabs: Arc<dyn HostTabs>,
        host_windows: Arc<dyn HostWindows>,
    ) -> Arc<Self> {
        let tracker = Arc::new(Checkpointed::load(Arc::clone(&session_store)).await);
        let settings = Arc::new(Checkpointed::load(Arc::clone(&session_store)).await);
        Arc::new(Self {
            session_store,
            sync_store,
            host_tabs,
            host_windows,
            tracker,
            settings,
            keep_alive: Mutex::new(None),
        })
    }

    pub fn tracker(&self) -> &Arc<Checkpointed<tab_tracker::TabsInfo>> {
        &self.tracker
    }

    pub fn settings(&self) -> &Arc<Checkpointed<SyncSettings>> {
        &self.settings
    }

    /// Registers every handler and arms the dispatcher. Called once at
    /// startup; the unarmed [`Listeners`] stage exists so the three handler
    /// groups below can be registered in a guaranteed relative order.
    pub fn wire(this: &Arc<Self>) -> Arc<Dispatcher> {
        let mut listeners = Listeners::new();
        Self::register_lifecycle(this, &mut listeners);
        Self::register_tracking(this, &mut listeners);
        Self::register_policies(this, &mut listeners);
        let dispatcher = Arc::new(listeners.resolve());
        info!(
            "dispatcher armed: {} created / {} removed / {} activated handlers",
            dispatcher.handler_count(EventKind::TabCreated),
            dispatcher.handler_count(EventKind::TabRemoved),
            dispatcher.handler_count(EventKind::TabActivated),
        );
        dispatcher
    }

    // Settings refresh and keep-alive on install, startup, and sync-store
    // change; install and startup also seed the tracker.
    fn register_lifecycle(background: &Arc<Self>, listeners: &mut Listeners) {
        for kind in [EventKind::Installed, EventKind::Startup] {
            let this = Arc::clone(background);
            listeners.add(kind, move |_event| {
                let this = Arc::clone(&this);
                Box::pin(async move {
                    this.refresh().await;
                    initialize_from_host(&this.tracker, this.host_tabs.as_ref()).await;
                })
            });
        }
        let this = Arc::clone(background);
        listeners.add(EventKind::SettingsChanged, move |_event| {
            let this = Arc::clone(&this);
            Box::pin(async move {
                this.refresh().await;
            })
        });
    }

    // Tracker handlers: keep TabsInfo in sync with the event stream.
    fn register_tracking(background: &Arc<Self>, listeners: &mut Listeners) {
        let this = Arc::clone(background);
        listeners.add(EventKind::TabCreated, move |event| {
            let this = Arc::clone(&this);
            Box::pin(async move {
                if let HostEvent::TabCreated(tab) = event {
                    this.tracker
                        .with_mut(|t| t.add_tab(tab.window_id, tab.id, tab.opener_id));
                    Checkpointed::schedule_save(&this.tracker);
                }
            })
        });
        let this = Arc::clone(background);
        listeners.add(EventKind::TabRemoved, move |event| {
            let this = Arc::clone(&this);
            Box::pin(async move {
                if let HostEvent::TabRemoved {
                    tab_id,
                    window_id,
                    is_window_closing,
                } = event
                {
                    this.tracker
                        .with_mut(|t| t.remove_tab(window_id, tab_id, is_window_closing));
                    Checkpointed::schedule_save(&this.tracker);
                }
            })
        });
        let this = Arc::clone(background);
        listeners.add(EventKind::TabActivated, move |event| {
            let this = Arc::clone(&this);
            Box::pin(async move {
                if let HostEvent::TabActivated { tab_id, window_id } = event {
                    on_tab_activated(&this.tracker, this.host_tabs.as_ref(), tab_id, window_id)
                        .await;
                }
            })
        });
        let this = Arc::clone(background);
        listeners.add(EventKind::TabAttached, move |event| {
            let this = Arc::clone(&this);
            Box::pin(async move {
                if let HostEvent::TabAttached { tab_id, window_id } = event {
                    this.tracker.with_mut(|t| t.add_tab(window_id, tab_id, None));
                    Checkpointed::schedule_save(&this.tracker);
                }
            })
        });
        let this = Arc::clone(background);
        listeners.add(EventKind::TabDetached, move |event| {
            let this = Arc::clone(&this);
            Box::pin(async move {
                if let HostEvent::TabDetached { tab_id, window_id } = event {
                    this.tracker
                        .with_mut(|t| t.remove_tab(window_id, tab_id, false));
                    Checkpointed::schedule_save(&this.tracker);
                }
            })
        });
        let this = Arc::clone(background);
        listeners.add(EventKind::TabUpdated, move |event| {
            let this = Arc::clone(&this);
            Box::pin(async move {
                // Pinning moves the tab without an activation event; resync
                // the window's recent-tab info from the host.
                if let HostEvent::TabUpdated {
                    window_id,
                    pinned: true,
                    ..
                } = event
                {
                    resync_recent_tab(&this.tracker, this.host_tabs.as_ref(), window_id).await;
                }
            })
        });
        let this = Arc::clone(background);
        listeners.add(EventKind::WindowFocusChanged, move |event| {
            let this = Arc::clone(&this);
            Box::pin(async move {
                let HostEvent::WindowFocusChanged { window_id } = event else {
                    return;
                };
                // Popup windows never become the reposition target.
                match this.host_windows.get_populated(window_id).await {
                    Ok(window) if window.kind == WindowKind::Normal => {
                        this.tracker.with_mut(|t| t.set_recent_window(window_id));
                        Checkpointed::schedule_save(&this.tracker);
                    }
                    Ok(_) => {}
                    Err(e) => debug!("focused window {} query failed: {}", window_id, e),
                }
            })
        });
    }

    // Policy handlers: run after the tracker has absorbed the same event.
    fn register_policies(background: &Arc<Self>, listeners: &mut Listeners) {
        let this = Arc::clone(background);
        listeners.add(EventKind::TabCreated, move |event| {
            let this = Arc::clone(&this);
            Box::pin(async move {
                if let HostEvent::TabCreated(tab) = event {
                    tab_creation::created_tab_mover(
                        this.host_tabs.as_ref(),
                        &this.tracker,
                        &this.settings,
                        tab,
                    )
                    .await;
                }
            })
        });
        let this = Arc::clone(background);
        listeners.add(EventKind::TabRemoved, move |event| {
            let this = Arc::clone(&this);
            Box::pin(async move {
                if let HostEvent::TabRemoved {
                    tab_id, window_id, ..
                } = event
                {
                    tab_activation::tab_removed_activater(
                        this.host_tabs.as_ref(),
                        &this.tracker,
                        &this.settings,
                        tab_id,
                        window_id,
                    )
                    .await;
                }
            })
        });
        let this = Arc::clone(background);
        listeners.add(EventKind::PopupCreated, move |event| {
            let this = Arc::clone(&this);
            Box::pin(async move {
                if let HostEvent::PopupCreated { window_id } = event {
                    popup_creation::created_popup_mover(
                        this.host_tabs.as_ref(),
                        this.host_windows.as_ref(),
                        &this.tracker,
                        &this.settings,
                        window_id,
                    )
                    .await;
                }
            })
        });
    }

    /// Re-reads the sync store into the cache and restarts the keep-alive
    /// loop to match the (possibly changed) persistence preference.
    async fn refresh(&self) {
        let settings = refresh_settings(&self.settings, self.sync_store.as_ref()).await;
        self.restart_keep_alive(settings.persistent_background);
    }

    /// Stops any running keep-alive loop and starts a fresh one when the
    /// persistent-background preference is on. The loop pings session storage
    /// on an interval shorter than the host's idle-shutdown horizon.
    fn restart_keep_alive(&self, persistent: bool) {
        let mut slot = lock(&self.keep_alive);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
        if !persistent {
            return;
        }
        debug!("keep-alive loop starting");
        let store = Arc::clone(&self.session_store);
        *slot = Some(tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(KEEP_ALIVE_INTERVAL_SECS)).await;
                if let Err(e) = store.get("TabsInfo:_instances").await {
                    warn!("keep-alive ping failed: {}", e);
                }
            }
        }));
    }

    /// Whether the keep-alive loop is currently running.
    pub fn keep_alive_running(&self) -> bool {
        lock(&self.keep_alive).is_some()
    }
}

fn lock(
    mutex: &Mutex<Option<JoinHandle<()>>>,
) -> MutexGuard<'_, Option<JoinHandle<()>>> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
