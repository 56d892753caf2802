// # Change Signal Trait
//
// Defines the interface for learning that the host's network configuration
// may have changed.
//
// ## Implementations
//
// - Netlink-based (Linux): `linkwatch-netlink` crate
// - Manual (embedding, tests): `linkwatch_core::memory::ManualChangeSignal`
//
// ## Usage
//
// ```rust,ignore
// use linkwatch_core::ChangeSignal;
// use tokio_stream::StreamExt;
//
// let mut notices = signal.watch();
// while notices.next().await.is_some() {
//     // re-enumerate interfaces
// }
// ```

use std::pin::Pin;
use tokio_stream::Stream;

/// Stream of zero-argument change notices
pub type ChangeStream = Pin<Box<dyn Stream<Item = ()> + Send + 'static>>;

/// Trait for change signal implementations
///
/// A signal carries no payload. It only says "look again". Consumers must
/// tolerate spurious notices; a notice after which nothing changed produces
/// no events downstream.
///
/// # Subscription
///
/// Each call to [`ChangeSignal::watch`] creates an independent subscription.
/// Dropping the returned stream unsubscribes and must release any
/// background resources (sockets, tasks).
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Platform-specific I/O (Netlink sockets, OS callbacks)
/// - ⚠️ Spawn tasks ONLY to wait for OS notifications (no polling loops)
///
/// ## Forbidden Capabilities
/// - ❌ Enumerating interfaces (use `InterfaceSource`)
/// - ❌ Filtering notices based on what changed
pub trait ChangeSignal: Send + Sync {
    /// Subscribe to change notices
    ///
    /// The stream should stay open for as long as notifications can arrive.
    /// Ending the stream tells the consumer that no further live passes will
    /// be triggered.
    fn watch(&self) -> ChangeStream;

    /// Get the signal name (for logging/debugging)
    fn signal_name(&self) -> &'static str;
}

/// Helper trait for constructing change signals from configuration
pub trait ChangeSignalFactory: Send + Sync {
    /// Create a ChangeSignal instance from configuration
    fn create(
        &self,
        config: &crate::config::SignalConfig,
    ) -> Result<Box<dyn ChangeSignal>, crate::Error>;
}
