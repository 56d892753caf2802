//! Listener registry
//!
//! One ordered list of listeners per event kind. Listeners are invoked
//! synchronously, in registration order, on the task running the pass.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tracing::warn;

use super::StateReconciler;
use crate::error::Error;
use crate::snapshot::InterfaceSnapshot;

/// Kind of interface event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceEventKind {
    /// An adapter id was seen for the first time
    Discovered,
    /// An adapter is (now) up
    Connected,
    /// An adapter is (now) not up, or has vanished
    Disconnected,
}

impl InterfaceEventKind {
    /// Classify a status for connected/disconnected reporting
    pub fn for_status(snapshot: &InterfaceSnapshot) -> Self {
        if snapshot.is_up() {
            InterfaceEventKind::Connected
        } else {
            InterfaceEventKind::Disconnected
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InterfaceEventKind::Discovered => "discovered",
            InterfaceEventKind::Connected => "connected",
            InterfaceEventKind::Disconnected => "disconnected",
        }
    }
}

/// A classified change for one adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceEvent {
    pub kind: InterfaceEventKind,
    pub interface: InterfaceSnapshot,
}

impl InterfaceEvent {
    pub fn new(kind: InterfaceEventKind, interface: InterfaceSnapshot) -> Self {
        Self { kind, interface }
    }
}

/// Handle returned on registration, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback invoked with the reconciler that produced the event
pub type Listener = Arc<dyn Fn(&StateReconciler, &InterfaceSnapshot) + Send + Sync>;

type Slot = RwLock<Vec<(ListenerId, Listener)>>;

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    discovered: Slot,
    connected: Slot,
    disconnected: Slot,
}

impl ListenerRegistry {
    fn slot(&self, kind: InterfaceEventKind) -> &Slot {
        match kind {
            InterfaceEventKind::Discovered => &self.discovered,
            InterfaceEventKind::Connected => &self.connected,
            InterfaceEventKind::Disconnected => &self.disconnected,
        }
    }

    pub(crate) fn add(&self, kind: InterfaceEventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.slot(kind)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        for slot in [&self.discovered, &self.connected, &self.disconnected] {
            let mut listeners = slot.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(pos) = listeners.iter().position(|(existing, _)| *existing == id) {
                listeners.remove(pos);
                return true;
            }
        }
        false
    }

    pub(crate) fn len(&self, kind: InterfaceEventKind) -> usize {
        self.slot(kind)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver one event to every listener of its kind
    ///
    /// The list is copied before the first call so listeners may register or
    /// remove listeners. A panicking listener is reported and skipped; the
    /// remaining listeners still run.
    pub(crate) fn dispatch(&self, source: &StateReconciler, event: &InterfaceEvent) -> Vec<Error> {
        let listeners: Vec<Listener> = self
            .slot(event.kind)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        let mut failures = Vec::new();
        for listener in listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                listener(source, &event.interface)
            }));
            if let Err(payload) = outcome {
                let message = panic_message(payload.as_ref());
                warn!(
                    event = event.kind.as_str(),
                    interface = event.interface.id(),
                    "Listener panicked: {}",
                    message
                );
                failures.push(Error::listener(event.kind.as_str(), message));
            }
        }
        failures
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Listener {
        Arc::new(|_: &StateReconciler, _: &InterfaceSnapshot| {})
    }

    #[test]
    fn test_ids_are_unique_across_kinds() {
        let registry = ListenerRegistry::default();
        let a = registry.add(InterfaceEventKind::Connected, noop());
        let b = registry.add(InterfaceEventKind::Disconnected, noop());
        assert_ne!(a, b);
        assert_eq!(registry.len(InterfaceEventKind::Connected), 1);
        assert_eq!(registry.len(InterfaceEventKind::Disconnected), 1);
    }

    #[test]
    fn test_remove_only_once() {
        let registry = ListenerRegistry::default();
        let id = registry.add(InterfaceEventKind::Discovered, noop());
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert_eq!(registry.len(InterfaceEventKind::Discovered), 0);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
