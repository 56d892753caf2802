//! Test doubles and common utilities for reconciler contract tests
//!
//! The in-memory collaborators from `linkwatch_core::memory` do most of the
//! work; this module adds an event recorder and a few odd collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use linkwatch_core::traits::{ChangeSignal, ChangeStream, InterfaceSource};
use linkwatch_core::{
    Error, InterfaceEventKind, InterfaceSnapshot, ManualChangeSignal, MemoryInterfaceSource,
    OperStatus, ReconcilerConfig, Result, StateReconciler,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const GUID_NAME: &str = "{3F2504E0-4F89-11D3-9A0C-0305E82C3301}";

/// Shorthand snapshot constructor
pub fn nic(id: &str, name: &str, status: OperStatus) -> InterfaceSnapshot {
    InterfaceSnapshot::new(id, name, format!("{name} adapter"), status)
}

/// Build a reconciler over a memory source and a manual signal
pub async fn reconciler_with(
    source: &MemoryInterfaceSource,
    signal: &ManualChangeSignal,
    suppress_guid: bool,
) -> StateReconciler {
    StateReconciler::new(
        Box::new(source.clone()),
        Box::new(signal.clone()),
        ReconcilerConfig::default().with_suppress_guid_named_adapters(suppress_guid),
    )
    .await
    .expect("initializing pass succeeds")
}

/// Build a reconciler with GUID suppression on and a signal nobody fires
pub async fn reconciler(source: &MemoryInterfaceSource) -> StateReconciler {
    reconciler_with(source, &ManualChangeSignal::new(), true).await
}

/// Records every delivered event, across all kinds, in delivery order
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<(InterfaceEventKind, InterfaceSnapshot)>>>,
}

impl EventRecorder {
    /// Create a recorder listening to all three event kinds
    pub fn attach(reconciler: &StateReconciler) -> Self {
        let recorder = Self::default();
        for kind in [
            InterfaceEventKind::Discovered,
            InterfaceEventKind::Connected,
            InterfaceEventKind::Disconnected,
        ] {
            let recorder = recorder.clone();
            reconciler.subscribe(kind, move |_, snapshot| recorder.push(kind, snapshot));
        }
        recorder
    }

    pub fn push(&self, kind: InterfaceEventKind, snapshot: &InterfaceSnapshot) {
        self.events.lock().unwrap().push((kind, snapshot.clone()));
    }

    pub fn events(&self) -> Vec<(InterfaceEventKind, InterfaceSnapshot)> {
        self.events.lock().unwrap().clone()
    }

    /// Event kinds delivered so far, paired with adapter ids
    pub fn kinds(&self) -> Vec<(InterfaceEventKind, String)> {
        self.events()
            .into_iter()
            .map(|(kind, snapshot)| (kind, snapshot.id().to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Wait until at least `count` events were delivered
    pub async fn wait_for(&self, count: usize) -> bool {
        wait_until(|| self.len() >= count).await
    }
}

/// Poll `condition` every few milliseconds for up to two seconds
pub async fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Sorted copy of the reconciler's state, for order-independent comparison
pub fn sorted_state(reconciler: &StateReconciler) -> Vec<InterfaceSnapshot> {
    let mut state = reconciler.current_state();
    state.sort_by(|a, b| a.id().cmp(b.id()));
    state
}

/// A source whose enumeration fails with an I/O error
pub struct BrokenSource;

#[async_trait]
impl InterfaceSource for BrokenSource {
    async fn enumerate(&self) -> Result<Vec<InterfaceSnapshot>> {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "sysfs not mounted",
        )))
    }

    fn source_name(&self) -> &'static str {
        "broken"
    }
}

/// A change signal whose stream ends immediately
pub struct ClosedSignal;

impl ChangeSignal for ClosedSignal {
    fn watch(&self) -> ChangeStream {
        Box::pin(tokio_stream::empty())
    }

    fn signal_name(&self) -> &'static str {
        "closed"
    }
}
