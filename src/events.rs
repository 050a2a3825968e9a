//! Event subscription manager.
//!
//! Independently developed handler modules register interest in host events
//! without knowing the global registration order; the manager guarantees
//! that, for the same event, handlers fire strictly in registration order,
//! each awaited to completion before the next starts. Tracker handlers are
//! registered before policy handlers so state updates always land before the
//! policies that read them.
//!
//! Registration is deferred: [`Listeners`] collects handlers while unarmed,
//! and [`Listeners::resolve`] consumes it to produce an armed [`Dispatcher`].
//! Registering after arming is a compile-time impossibility.

use std::collections::HashMap;

use log::debug;

use crate::types::events::{EventKind, HostEvent};
use crate::types::BoxFuture;

/// An event handler. Handlers are responsible for catching their own errors;
/// the dispatcher never retries and a misbehaving handler must not prevent
/// siblings from running.
pub type EventHandler = Box<dyn Fn(HostEvent) -> BoxFuture<'static, ()> + Send + Sync>;

/// Unarmed registration collector.
#[derive(Default)]
pub struct Listeners {
    // Insertion order doubles as dispatch order per kind.
    handlers: Vec<(EventKind, EventHandler)>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a handler against an event kind. Does not yet attach anything
    /// to the host.
    pub fn add<F>(&mut self, kind: EventKind, handler: F)
    where
        F: Fn(HostEvent) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.handlers.push((kind, Box::new(handler)));
    }

    /// Arms the collected registrations. One-time transition; the returned
    /// dispatcher invokes each kind's handlers in registration order.
    pub fn resolve(self) -> Dispatcher {
        let mut by_kind: HashMap<EventKind, Vec<EventHandler>> = HashMap::new();
        for (kind, handler) in self.handlers {
            by_kind.entry(kind).or_default().push(handler);
        }
        Dispatcher { by_kind }
    }
}

/// Armed dispatcher produced by [`Listeners::resolve`].
pub struct Dispatcher {
    by_kind: HashMap<EventKind, Vec<EventHandler>>,
}

impl Dispatcher {
    /// Delivers one host event: every handler registered for its kind runs
    /// in registration order, each awaited before the next is invoked.
    pub async fn dispatch(&self, event: HostEvent) {
        let kind = event.kind();
        let Some(handlers) = self.by_kind.get(&kind) else {
            debug!("no handlers for {:?}", kind);
            return;
        };
        for handler in handlers {
            handler(event.clone()).await;
        }
    }

    /// Number of handlers registered for a kind, for wiring assertions.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.by_kind.get(&kind).map_or(0, Vec::len)
    }
}
