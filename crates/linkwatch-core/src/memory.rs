// # In-Memory Collaborators
//
// In-memory implementations of InterfaceSource and ChangeSignal.
//
// ## Purpose
//
// Lets applications drive the reconciler from their own data (for example
// an interface list obtained over RPC from another host) and lets tests
// script interface changes deterministically.
//
// Both types are cheap handles over shared state: clone one, hand the clone
// to the reconciler, keep the other to mutate or notify.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::snapshot::{InterfaceSnapshot, OperStatus};
use crate::traits::{ChangeSignal, ChangeStream, InterfaceSource};
use crate::Error;

#[derive(Debug, Default)]
struct SourceState {
    interfaces: Vec<InterfaceSnapshot>,
    fail_next: Option<String>,
    enumerations: usize,
}

/// In-memory interface source
///
/// Enumeration returns the current table in insertion order.
///
/// # Example
///
/// ```rust
/// use linkwatch_core::memory::MemoryInterfaceSource;
/// use linkwatch_core::{InterfaceSnapshot, InterfaceSource, OperStatus};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let source = MemoryInterfaceSource::new();
///     source.upsert(InterfaceSnapshot::new("2", "eth0", "e1000", OperStatus::Up));
///
///     let nics = source.enumerate().await?;
///     assert_eq!(nics.len(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryInterfaceSource {
    inner: Arc<Mutex<SourceState>>,
}

impl MemoryInterfaceSource {
    /// Create a new empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source pre-populated with interfaces
    pub fn with_interfaces(interfaces: impl IntoIterator<Item = InterfaceSnapshot>) -> Self {
        let source = Self::new();
        source.set_interfaces(interfaces);
        source
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SourceState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the whole interface table
    pub fn set_interfaces(&self, interfaces: impl IntoIterator<Item = InterfaceSnapshot>) {
        self.state().interfaces = interfaces.into_iter().collect();
    }

    /// Insert an interface, or replace the one with the same id
    pub fn upsert(&self, snapshot: InterfaceSnapshot) {
        let mut state = self.state();
        match state.interfaces.iter_mut().find(|nic| nic.id() == snapshot.id()) {
            Some(existing) => *existing = snapshot,
            None => state.interfaces.push(snapshot),
        }
    }

    /// Remove an interface; returns whether it was present
    pub fn remove(&self, id: &str) -> bool {
        let mut state = self.state();
        let before = state.interfaces.len();
        state.interfaces.retain(|nic| nic.id() != id);
        state.interfaces.len() != before
    }

    /// Change the status of one interface; returns whether it was present
    pub fn set_status(&self, id: &str, status: OperStatus) -> bool {
        let mut state = self.state();
        match state.interfaces.iter_mut().find(|nic| nic.id() == id) {
            Some(nic) => {
                *nic = nic.clone().with_status(status);
                true
            }
            None => false,
        }
    }

    /// Make the next enumeration fail once with the given message
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state().fail_next = Some(message.into());
    }

    /// Current interface table
    pub fn interfaces(&self) -> Vec<InterfaceSnapshot> {
        self.state().interfaces.clone()
    }

    /// Number of enumerations served, failed ones included
    pub fn enumeration_count(&self) -> usize {
        self.state().enumerations
    }
}

#[async_trait]
impl InterfaceSource for MemoryInterfaceSource {
    async fn enumerate(&self) -> Result<Vec<InterfaceSnapshot>, Error> {
        let mut state = self.state();
        state.enumerations += 1;
        if let Some(message) = state.fail_next.take() {
            return Err(Error::enumeration(message));
        }
        Ok(state.interfaces.clone())
    }

    fn source_name(&self) -> &'static str {
        "memory"
    }
}

/// Capacity of the broadcast channel behind [`ManualChangeSignal`]
///
/// A subscriber that falls further behind still sees one notice for the
/// backlog, which is all a change signal needs to convey.
const MANUAL_SIGNAL_CAPACITY: usize = 64;

/// Change signal fired explicitly by the application
#[derive(Debug, Clone)]
pub struct ManualChangeSignal {
    tx: broadcast::Sender<()>,
}

impl ManualChangeSignal {
    /// Create a new signal with no subscribers
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(MANUAL_SIGNAL_CAPACITY);
        Self { tx }
    }

    /// Fire the signal; returns the number of subscribers reached
    ///
    /// Notices sent while nobody is subscribed are dropped.
    pub fn notify(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ManualChangeSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeSignal for ManualChangeSignal {
    fn watch(&self) -> ChangeStream {
        // A lagged receiver still means "something changed".
        Box::pin(BroadcastStream::new(self.tx.subscribe()).map(|_| ()))
    }

    fn signal_name(&self) -> &'static str {
        "manual"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nic(id: &str, name: &str, status: OperStatus) -> InterfaceSnapshot {
        InterfaceSnapshot::new(id, name, "", status)
    }

    #[tokio::test]
    async fn test_memory_source_table_edits() {
        let source = MemoryInterfaceSource::with_interfaces([nic("1", "eth0", OperStatus::Up)]);

        source.upsert(nic("2", "wlan0", OperStatus::Down));
        source.upsert(nic("1", "eth0", OperStatus::Dormant));
        assert!(source.set_status("2", OperStatus::Up));
        assert!(!source.set_status("9", OperStatus::Up));

        let nics = source.enumerate().await.unwrap();
        assert_eq!(
            nics,
            vec![nic("1", "eth0", OperStatus::Dormant), nic("2", "wlan0", OperStatus::Up)]
        );

        assert!(source.remove("1"));
        assert!(!source.remove("1"));
        assert_eq!(source.interfaces().len(), 1);
    }

    #[tokio::test]
    async fn test_fail_next_fails_once() {
        let source = MemoryInterfaceSource::with_interfaces([nic("1", "eth0", OperStatus::Up)]);
        source.fail_next("driver reset");

        let err = source.enumerate().await.unwrap_err();
        assert!(err.is_enumeration());
        assert_eq!(source.enumerate().await.unwrap().len(), 1);
        assert_eq!(source.enumeration_count(), 2);
    }

    #[tokio::test]
    async fn test_manual_signal_reaches_every_subscriber() {
        let signal = ManualChangeSignal::new();
        assert_eq!(signal.notify(), 0);

        let mut first = signal.watch();
        let mut second = signal.clone().watch();
        assert_eq!(signal.subscriber_count(), 2);

        assert_eq!(signal.notify(), 2);
        assert_eq!(first.next().await, Some(()));
        assert_eq!(second.next().await, Some(()));

        drop(first);
        assert_eq!(signal.subscriber_count(), 1);
    }
}
