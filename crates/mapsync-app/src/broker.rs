//! In-process publish/subscribe event broker
//!
//! Components never call each other directly; they publish [`Event`]s and
//! subscribe to the [`EventKind`]s they care about. A broker is an explicit
//! instance: clone it into every component that needs it.
//!
//! Dispatch is synchronous. Handlers for one kind run in registration order,
//! and a handler may fire further events from inside its callback (the nested
//! dispatch completes before the outer one continues). The registry lock is
//! never held while a handler runs.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use mapsync_core::prelude::*;
use mapsync_core::{Event, EventKind};

/// Callback invoked with each event of the kind it was registered for
pub type HandlerFn = dyn Fn(&Event) -> Result<()> + Send + Sync;

/// Token returned by [`EventBroker::add_handler`], used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Clone)]
struct Subscriber {
    id: HandlerId,
    name: String,
    handler: Arc<HandlerFn>,
}

/// Outcome of a single [`EventBroker::fire_event`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that completed successfully
    pub delivered: usize,
    /// Handlers that returned an error or panicked
    pub failed: usize,
}

#[derive(Default)]
struct BrokerInner {
    registry: RwLock<HashMap<EventKind, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

/// Cheaply cloneable handle to a shared handler registry
#[derive(Clone, Default)]
pub struct EventBroker {
    inner: Arc<BrokerInner>,
}

impl fmt::Debug for EventBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.read().unwrap_or_else(|e| e.into_inner());
        let counts: HashMap<EventKind, usize> =
            registry.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventBroker")
            .field("handlers", &counts)
            .finish()
    }
}

impl EventBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every event of `kind`
    pub fn add_handler<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&Event) -> Result<()> + Send + Sync + 'static,
    {
        self.add_named_handler(kind, "anonymous", handler)
    }

    /// Register `handler` under a name that shows up in failure logs
    pub fn add_named_handler<F>(
        &self,
        kind: EventKind,
        name: impl Into<String>,
        handler: F,
    ) -> HandlerId
    where
        F: Fn(&Event) -> Result<()> + Send + Sync + 'static,
    {
        let id = HandlerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Subscriber {
            id,
            name: name.into(),
            handler: Arc::new(handler),
        };
        trace!("Registering handler '{}' for {}", subscriber.name, kind);

        self.inner
            .registry
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(kind)
            .or_default()
            .push(subscriber);
        id
    }

    /// Unregister a handler. Returns false if the id is unknown.
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        let mut registry = self.inner.registry.write().unwrap_or_else(|e| e.into_inner());
        for subscribers in registry.values_mut() {
            if let Some(idx) = subscribers.iter().position(|s| s.id == id) {
                let removed = subscribers.remove(idx);
                trace!("Removed handler '{}'", removed.name);
                return true;
            }
        }
        false
    }

    /// Number of handlers currently registered for `kind`
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.inner
            .registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Deliver `event` to every handler registered for its kind.
    ///
    /// A failing handler (error or panic) is logged and skipped; the rest
    /// still run and nothing propagates to the caller.
    pub fn fire_event(&self, event: Event) -> DispatchReport {
        let kind = event.kind();

        // Snapshot so handlers can register, unregister or fire re-entrantly
        let subscribers: Vec<Subscriber> = self
            .inner
            .registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        let mut report = DispatchReport::default();
        if subscribers.is_empty() {
            trace!("No handlers for {}", kind);
            return report;
        }

        debug!("Dispatching {} to {} handler(s)", kind, subscribers.len());

        for subscriber in &subscribers {
            match catch_unwind(AssertUnwindSafe(|| (subscriber.handler)(&event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(
                        "Handler '{}' failed while handling {}: {}",
                        subscriber.name, kind, e
                    );
                }
                Err(payload) => {
                    report.failed += 1;
                    let err = Error::handler(
                        subscriber.name.as_str(),
                        format!("panicked: {}", panic_message(payload.as_ref())),
                    );
                    error!("{} (while handling {})", err, kind);
                }
            }
        }

        report
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
