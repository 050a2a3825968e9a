//! Checkpointed state service.
//!
//! Gives stateful components (the tab tracker, the settings cache) cold-start
//! resilience without each one reimplementing persistence. A component's
//! plain-data fields are serialized one storage key per field
//! (`"<Name>:<field>"`), with a sentinel key (`"<Name>:_instances"`) flagging
//! that a checkpoint exists at all, distinct from "a checkpoint exists but is
//! empty".
//!
//! Saves are coalesced: each request waits `STATE_SAVE_DELAY_MS` and aborts
//! if a newer request arrives in the meantime, so a burst of tab events
//! produces one write pass, not one per mutation. Host storage writes are
//! rate-limited and slow; naive per-event persistence would both throttle
//! and slow down the extension.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, error};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::time::sleep;

use crate::constants::STATE_SAVE_DELAY_MS;
use crate::storage::{get_session_state, set_session_state, KeyValueStore};

/// Name under which a component's checkpoint keys are filed.
pub trait CheckpointName {
    const NAME: &'static str;
}

// Sentinel field flagging that a checkpoint exists.
const FLAG_FIELD: &str = "_instances";

/// A component state with durable, coalesced checkpointing.
///
/// The inner state is plain data (serde round-trippable); derived or
/// non-serializable state belongs in `#[serde(skip)]` fields, which are never
/// persisted. Access goes through [`with`](Checkpointed::with) /
/// [`with_mut`](Checkpointed::with_mut) so the lock is never held across an
/// await point.
pub struct Checkpointed<T> {
    state: Mutex<T>,
    store: Arc<dyn KeyValueStore>,
    save_seq: AtomicU64,
    save_lock: tokio::sync::Mutex<()>,
}

impl<T> Checkpointed<T>
where
    T: CheckpointName + Default + Serialize + DeserializeOwned + Send + 'static,
{
    /// Constructs the component's state, restoring a previous checkpoint from
    /// the store when one exists. Fields missing from storage keep their
    /// defaults; a corrupt checkpoint degrades to defaults rather than
    /// failing the cold start.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let mut state = T::default();
        if get_session_state(store.as_ref(), &Self::key_for(FLAG_FIELD))
            .await
            .is_some()
        {
            debug!("{}: loading checkpoint", T::NAME);
            state = Self::load_fields(store.as_ref()).await;
        } else {
            debug!("{}: no checkpoint, starting fresh", T::NAME);
        }
        Self {
            state: Mutex::new(state),
            store,
            save_seq: AtomicU64::new(0),
            save_lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn load_fields(store: &dyn KeyValueStore) -> T {
        let defaults = match serde_json::to_value(T::default()) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                error!("{}: state does not serialize to an object", T::NAME);
                return T::default();
            }
        };
        let mut loaded = defaults.clone();
        for (field, slot) in loaded.iter_mut() {
            if let Some(value) = get_session_state(store, &Self::key_for(field)).await {
                *slot = value;
            }
        }
        match serde_json::from_value(Value::Object(loaded)) {
            Ok(state) => state,
            Err(e) => {
                error!("{}: checkpoint did not deserialize: {}", T::NAME, e);
                T::default()
            }
        }
    }

    /// Read access to the inner state.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock())
    }

    /// Mutating access to the inner state. Callers schedule a save afterwards
    /// when the mutation should be durable.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.lock())
    }

    /// Serializes eligible fields and writes them, coalescing concurrent
    /// calls: a newer save request supersedes one whose delay has not elapsed
    /// yet, and writes are serialized through an internal lock so a
    /// superseded save never interleaves with its successor. The sentinel key
    /// is written last.
    pub async fn save_state(&self) {
        let seq = self.save_seq.fetch_add(1, Ordering::SeqCst) + 1;
        sleep(Duration::from_millis(STATE_SAVE_DELAY_MS)).await;
        if self.superseded(seq) {
            debug!("{}: save superseded before start", T::NAME);
            return;
        }
        let _guard = self.save_lock.lock().await;
        if self.superseded(seq) {
            debug!("{}: save superseded while queued", T::NAME);
            return;
        }
        let snapshot = match serde_json::to_value(&*self.lock()) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                error!("{}: state does not serialize to an object", T::NAME);
                return;
            }
            Err(e) => {
                error!("{}: state serialization failed: {}", T::NAME, e);
                return;
            }
        };
        for (field, value) in snapshot {
            if self.superseded(seq) {
                debug!("{}: save aborted mid-write by a newer request", T::NAME);
                return;
            }
            if field.starts_with('_') {
                continue;
            }
            set_session_state(self.store.as_ref(), &Self::key_for(&field), value).await;
        }
        set_session_state(
            self.store.as_ref(),
            &Self::key_for(FLAG_FIELD),
            Value::Bool(true),
        )
        .await;
        debug!("{}: state saved", T::NAME);
    }

    /// Fire-and-forget save used on the event path, where handlers must not
    /// block on the checkpoint delay.
    pub fn schedule_save(this: &Arc<Self>) {
        let this = Arc::clone(this);
        tokio::spawn(async move {
            this.save_state().await;
        });
    }

    fn superseded(&self, seq: u64) -> bool {
        self.save_seq.load(Ordering::SeqCst) != seq
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn key_for(field: &str) -> String {
        format!("{}:{}", T::NAME, field)
    }
}
