//! State reconciler
//!
//! The StateReconciler is responsible for:
//! - Enumerating interfaces via InterfaceSource
//! - Diffing each snapshot against retained state
//! - Classifying differences into discovered / connected / disconnected
//! - Notifying listeners, subject to the GUID name filter
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ ChangeSignal │──── notice ────┐
//! └──────────────┘                │
//!                                 ▼
//!                       ┌─────────────────┐   enumerate   ┌─────────────────┐
//!                       │ StateReconciler │──────────────▶│ InterfaceSource │
//!                       └─────────────────┘               └─────────────────┘
//!                                 │
//!                 ┌───────────────┴───────────────┐
//!                 ▼                               ▼
//!        ┌────────────────┐              ┌────────────────┐
//!        │ Retained state │              │   Listeners    │
//!        │ (id → snapshot)│              │ (per kind)     │
//!        └────────────────┘              └────────────────┘
//! ```
//!
//! ## Pass Flow
//!
//! 1. Enumerate the source (failure aborts the pass untouched)
//! 2. New ids are inserted and, on live passes, reported as discovered
//!    followed by connected or disconnected
//! 3. Known ids whose status changed are reported as connected or
//!    disconnected
//! 4. Known ids missing from the enumeration are forced to `Down` and
//!    reported as disconnected once
//! 5. The initializing pass only seeds retained state

pub mod listeners;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::config::ReconcilerConfig;
use crate::error::{Error, Result};
use crate::filter::contains_guid;
use crate::snapshot::{InterfaceSnapshot, OperStatus};
use crate::traits::{ChangeSignal, ChangeStream, InterfaceSource};

pub use listeners::{InterfaceEvent, InterfaceEventKind, Listener, ListenerId};
use listeners::ListenerRegistry;

/// Which kind of pass produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// The construction-time pass; never notifies
    Initializing,
    /// Any later pass
    Live,
}

/// Outcome of one reconciliation pass
#[derive(Debug)]
pub struct PassReport {
    /// Pass kind
    pub kind: PassKind,
    /// Events delivered to listeners, in delivery order
    pub events: Vec<InterfaceEvent>,
    /// Events withheld by the GUID name filter
    pub suppressed: usize,
    /// Listeners that panicked during delivery
    pub listener_failures: Vec<Error>,
    /// When retained state was last updated by this pass
    pub completed_at: DateTime<Utc>,
}

impl PassReport {
    fn new(kind: PassKind, completed_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            events: Vec::new(),
            suppressed: 0,
            listener_failures: Vec::new(),
            completed_at,
        }
    }

    /// Number of delivered events of one kind
    pub fn count(&self, kind: InterfaceEventKind) -> usize {
        self.events.iter().filter(|event| event.kind == kind).count()
    }

    /// True if the pass classified no change at all
    pub fn is_quiet(&self) -> bool {
        self.events.is_empty() && self.suppressed == 0
    }
}

/// Network interface state reconciler
///
/// Owns the authoritative map from adapter id to last known snapshot and
/// turns fresh enumerations into discovered / connected / disconnected
/// notifications.
///
/// ## Lifecycle
///
/// 1. Create with [`StateReconciler::new()`] (runs the silent initializing
///    pass and subscribes to the change signal)
/// 2. Register listeners with [`StateReconciler::on_connected()`] and friends
/// 3. Drive live passes with [`StateReconciler::run()`], or call
///    [`StateReconciler::reconcile()`] directly
///
/// ## Threading
///
/// Passes are serialized by an async mutex held for the whole
/// enumerate → diff → notify sequence. Retained state sits behind its own
/// lock, held only while diffing or copying, so listeners may call
/// [`StateReconciler::current_state()`]. Listeners must not call
/// [`StateReconciler::reconcile()`]: the pass mutex is not re-entrant.
pub struct StateReconciler {
    /// Interface source queried on every pass
    source: Box<dyn InterfaceSource>,

    /// Change signal driving live passes
    signal: Box<dyn ChangeSignal>,

    /// Subscription opened at construction, consumed by `run`
    subscription: Mutex<Option<ChangeStream>>,

    /// Every adapter id ever seen, with its best-known snapshot
    retained: RwLock<BTreeMap<String, InterfaceSnapshot>>,

    /// Serializes reconciliation passes
    pass_lock: tokio::sync::Mutex<()>,

    /// Withhold notifications for GUID-named adapters
    suppress_guid_named: AtomicBool,

    /// Registered listeners
    listeners: ListenerRegistry,

    /// Completion time of the latest successful pass
    last_reconciled_at: RwLock<Option<DateTime<Utc>>>,
}

impl StateReconciler {
    /// Create a reconciler and run its initializing pass
    ///
    /// # Parameters
    ///
    /// - `source`: Interface source implementation
    /// - `signal`: Change signal implementation
    /// - `config`: Reconciler configuration
    ///
    /// # Returns
    ///
    /// - `Ok(StateReconciler)`: Retained state seeded from the first
    ///   enumeration, change signal subscribed
    /// - `Err(Error::Enumeration)`: The first enumeration failed
    pub async fn new(
        source: Box<dyn InterfaceSource>,
        signal: Box<dyn ChangeSignal>,
        config: ReconcilerConfig,
    ) -> Result<Self> {
        let reconciler = Self {
            source,
            signal,
            subscription: Mutex::new(None),
            retained: RwLock::new(BTreeMap::new()),
            pass_lock: tokio::sync::Mutex::new(()),
            suppress_guid_named: AtomicBool::new(config.suppress_guid_named_adapters),
            listeners: ListenerRegistry::default(),
            last_reconciled_at: RwLock::new(None),
        };

        reconciler.pass(PassKind::Initializing).await?;
        info!(
            source = reconciler.source.source_name(),
            "Initial state: {} interface(s)",
            reconciler.retained_len()
        );

        let notices = reconciler.signal.watch();
        *reconciler.subscription_slot() = Some(notices);

        Ok(reconciler)
    }

    /// Copy of every adapter ever seen, with its best-known status
    ///
    /// Order is unspecified. Adapters that vanished are reported as `Down`.
    pub fn current_state(&self) -> Vec<InterfaceSnapshot> {
        self.retained_read().values().cloned().collect()
    }

    /// Best-known snapshot for one adapter id
    pub fn interface(&self, id: &str) -> Option<InterfaceSnapshot> {
        self.retained_read().get(id).cloned()
    }

    /// Whether notifications for GUID-named adapters are withheld
    pub fn suppress_guid_named_adapters(&self) -> bool {
        self.suppress_guid_named.load(Ordering::SeqCst)
    }

    /// Toggle GUID name suppression for future notifications
    pub fn set_suppress_guid_named_adapters(&self, suppress: bool) {
        self.suppress_guid_named.store(suppress, Ordering::SeqCst);
    }

    /// Completion time of the latest successful pass
    pub fn last_reconciled_at(&self) -> Option<DateTime<Utc>> {
        *self
            .last_reconciled_at
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener for one event kind
    pub fn subscribe<F>(&self, kind: InterfaceEventKind, listener: F) -> ListenerId
    where
        F: Fn(&StateReconciler, &InterfaceSnapshot) + Send + Sync + 'static,
    {
        self.listeners.add(kind, Arc::new(listener))
    }

    /// Register a listener for newly discovered adapters
    pub fn on_discovered<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StateReconciler, &InterfaceSnapshot) + Send + Sync + 'static,
    {
        self.subscribe(InterfaceEventKind::Discovered, listener)
    }

    /// Register a listener for adapters becoming up
    pub fn on_connected<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StateReconciler, &InterfaceSnapshot) + Send + Sync + 'static,
    {
        self.subscribe(InterfaceEventKind::Connected, listener)
    }

    /// Register a listener for adapters going down or vanishing
    pub fn on_disconnected<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StateReconciler, &InterfaceSnapshot) + Send + Sync + 'static,
    {
        self.subscribe(InterfaceEventKind::Disconnected, listener)
    }

    /// Remove a listener; returns whether it was registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Number of listeners registered for one event kind
    pub fn listener_count(&self, kind: InterfaceEventKind) -> usize {
        self.listeners.len(kind)
    }

    /// Run one live pass now
    ///
    /// # Returns
    ///
    /// - `Ok(PassReport)`: What was classified and delivered
    /// - `Err(Error::Enumeration)`: The source failed; nothing changed
    pub async fn reconcile(&self) -> Result<PassReport> {
        self.pass(PassKind::Live).await
    }

    /// Run live passes on every change notice until Ctrl-C
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown, or the change signal ended
    /// - `Err(Error::ChangeSignal)`: Already running elsewhere
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run live passes until the shutdown receiver fires
    ///
    /// Like [`StateReconciler::run()`], with a programmatic shutdown for
    /// embedding applications and tests. Dropping the sender also stops the
    /// loop. The subscription is kept when the loop stops, including when
    /// this future is dropped, so the reconciler can be run again.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        let mut lease = SubscriptionLease::take(&self.subscription).ok_or_else(|| {
            Error::change_signal("change signal subscription is already being consumed")
        })?;

        info!(
            signal = self.signal.signal_name(),
            "Watching for network changes"
        );

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                notice = lease.notices.next() => match notice {
                    Some(()) => self.handle_change().await,
                    None => {
                        warn!(signal = self.signal.signal_name(), "Change signal ended");
                        return Ok(());
                    }
                },

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    return Ok(());
                }
            }
        }
    }

    /// Handle one change notice
    ///
    /// A failed pass is logged and the loop keeps waiting for the next
    /// notice. Retry policy belongs to the change signal.
    async fn handle_change(&self) {
        match self.pass(PassKind::Live).await {
            Ok(report) => {
                debug!(
                    delivered = report.events.len(),
                    suppressed = report.suppressed,
                    "Live pass complete"
                );
            }
            Err(e) => {
                error!("Reconciliation pass failed: {}", e);
            }
        }
    }

    /// Run one reconciliation pass
    async fn pass(&self, kind: PassKind) -> Result<PassReport> {
        let _serial = self.pass_lock.lock().await;

        let current = match self.source.enumerate().await {
            Ok(current) => current,
            Err(e @ Error::Enumeration(_)) => return Err(e),
            Err(e) => {
                return Err(Error::enumeration(format!(
                    "{}: {}",
                    self.source.source_name(),
                    e
                )));
            }
        };

        let mut present: HashMap<&str, &InterfaceSnapshot> = HashMap::with_capacity(current.len());
        for nic in &current {
            if present.insert(nic.id(), nic).is_some() {
                return Err(Error::enumeration(format!(
                    "{} reported interface id {} twice",
                    self.source.source_name(),
                    nic.id()
                )));
            }
        }

        let pending = self.apply(&current, &present, kind);

        let completed_at = Utc::now();
        *self
            .last_reconciled_at
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(completed_at);

        let mut report = PassReport::new(kind, completed_at);
        for event in pending {
            self.deliver(event, &mut report);
        }
        Ok(report)
    }

    /// Update retained state and classify the differences
    ///
    /// Returns the events to emit; always empty for the initializing pass.
    fn apply(
        &self,
        current: &[InterfaceSnapshot],
        present: &HashMap<&str, &InterfaceSnapshot>,
        kind: PassKind,
    ) -> Vec<InterfaceEvent> {
        let live = kind == PassKind::Live;
        let mut events = Vec::new();
        let mut retained = self
            .retained
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        for nic in current {
            match retained.insert(nic.id().to_string(), nic.clone()) {
                None => {
                    if live {
                        events.push(InterfaceEvent::new(
                            InterfaceEventKind::Discovered,
                            nic.clone(),
                        ));
                        events.push(InterfaceEvent::new(
                            InterfaceEventKind::for_status(nic),
                            nic.clone(),
                        ));
                    }
                }
                Some(known) => {
                    if known.name() != nic.name() {
                        debug!(id = nic.id(), "Interface renamed {} -> {}", known.name(), nic.name());
                    }
                    if live && known.status() != nic.status() {
                        events.push(InterfaceEvent::new(
                            InterfaceEventKind::for_status(nic),
                            nic.clone(),
                        ));
                    }
                }
            }
        }

        for (id, known) in retained.iter_mut() {
            if present.contains_key(id.as_str()) || known.status() == OperStatus::Down {
                continue;
            }
            *known = known.clone().with_status(OperStatus::Down);
            if live {
                events.push(InterfaceEvent::new(
                    InterfaceEventKind::Disconnected,
                    known.clone(),
                ));
            }
        }

        events
    }

    /// Deliver one event unless the name filter withholds it
    fn deliver(&self, event: InterfaceEvent, report: &mut PassReport) {
        if self.suppress_guid_named_adapters() && contains_guid(event.interface.name()) {
            debug!(
                event = event.kind.as_str(),
                interface = event.interface.id(),
                "Suppressed event for GUID-named interface {}",
                event.interface.name()
            );
            report.suppressed += 1;
            return;
        }

        debug!(
            event = event.kind.as_str(),
            interface = event.interface.id(),
            status = %event.interface.status(),
            listeners = self.listeners.len(event.kind),
            "Delivering event for {}",
            event.interface.name()
        );

        let failures = self.listeners.dispatch(self, &event);
        report.listener_failures.extend(failures);
        report.events.push(event);
    }

    fn retained_read(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, InterfaceSnapshot>> {
        self.retained.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn retained_len(&self) -> usize {
        self.retained_read().len()
    }

    fn subscription_slot(&self) -> std::sync::MutexGuard<'_, Option<ChangeStream>> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Change stream on loan from the reconciler for one run loop
///
/// Put back into the slot on drop, so a cancelled run future does not lose
/// the subscription.
struct SubscriptionLease<'a> {
    slot: &'a Mutex<Option<ChangeStream>>,
    notices: ChangeStream,
}

impl<'a> SubscriptionLease<'a> {
    fn take(slot: &'a Mutex<Option<ChangeStream>>) -> Option<Self> {
        let notices = slot.lock().unwrap_or_else(PoisonError::into_inner).take()?;
        Some(Self { slot, notices })
    }
}

impl Drop for SubscriptionLease<'_> {
    fn drop(&mut self) {
        let notices = std::mem::replace(&mut self.notices, Box::pin(tokio_stream::empty()));
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(notices);
    }
}
