use std::sync::{Arc, Mutex};
use std::time::Duration;

use tab_positioner::events::Listeners;
use tab_positioner::types::events::{EventKind, HostEvent};

fn log_handler(
    log: &Arc<Mutex<Vec<u32>>>,
    id: u32,
    delay_ms: u64,
) -> impl Fn(HostEvent) -> tab_positioner::types::BoxFuture<'static, ()> + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |_event| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            if delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            log.lock().unwrap().push(id);
        })
    }
}

#[tokio::test]
async fn test_handlers_run_in_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut listeners = Listeners::new();
    // The first handler sleeps; if dispatch did not await it to completion
    // before starting the next, the log order would invert.
    listeners.add(EventKind::Startup, log_handler(&log, 1, 30));
    listeners.add(EventKind::Startup, log_handler(&log, 2, 0));
    listeners.add(EventKind::Startup, log_handler(&log, 3, 0));

    let dispatcher = listeners.resolve();
    dispatcher.dispatch(HostEvent::Startup).await;

    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_dispatch_only_invokes_matching_kind() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut listeners = Listeners::new();
    listeners.add(EventKind::Startup, log_handler(&log, 1, 0));
    listeners.add(EventKind::SettingsChanged, log_handler(&log, 2, 0));

    let dispatcher = listeners.resolve();
    dispatcher.dispatch(HostEvent::SettingsChanged).await;

    assert_eq!(*log.lock().unwrap(), vec![2]);
}

#[tokio::test]
async fn test_dispatch_without_handlers_is_noop() {
    let dispatcher = Listeners::new().resolve();
    dispatcher.dispatch(HostEvent::Installed).await;
}

#[tokio::test]
async fn test_repeated_dispatch_reruns_every_handler() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut listeners = Listeners::new();
    listeners.add(EventKind::Installed, log_handler(&log, 1, 0));

    let dispatcher = listeners.resolve();
    dispatcher.dispatch(HostEvent::Installed).await;
    dispatcher.dispatch(HostEvent::Installed).await;

    assert_eq!(*log.lock().unwrap(), vec![1, 1]);
}

#[test]
fn test_handler_count_per_kind() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut listeners = Listeners::new();
    listeners.add(EventKind::TabCreated, log_handler(&log, 1, 0));
    listeners.add(EventKind::TabCreated, log_handler(&log, 2, 0));
    listeners.add(EventKind::TabRemoved, log_handler(&log, 3, 0));

    let dispatcher = listeners.resolve();
    assert_eq!(dispatcher.handler_count(EventKind::TabCreated), 2);
    assert_eq!(dispatcher.handler_count(EventKind::TabRemoved), 1);
    assert_eq!(dispatcher.handler_count(EventKind::PopupCreated), 0);
}
