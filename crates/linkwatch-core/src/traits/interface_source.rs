// # Interface Source Trait
//
// Defines the interface for enumerating the host's network interfaces.
//
// ## Implementations
//
// - Sysfs-based (Linux): `linkwatch-netlink` crate
// - In-memory (embedding, tests): `linkwatch_core::memory::MemoryInterfaceSource`
//
// ## Usage
//
// ```rust,ignore
// use linkwatch_core::InterfaceSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* InterfaceSource implementation */;
//
//     for nic in source.enumerate().await? {
//         println!("{nic}");
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::snapshot::InterfaceSnapshot;

/// Trait for interface source implementations
///
/// A source answers one question: which interfaces exist right now, and
/// what is their operational status.
///
/// # Contract
///
/// - `enumerate()` returns a complete, consistent snapshot of the adapters
///   currently visible. It may be empty.
/// - Each id appears at most once.
/// - A failure means no snapshot at all. Partial results must not be
///   returned as `Ok`.
/// - The call is expected to be bounded. Timeouts belong to the caller.
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Platform-specific reads (sysfs, procfs, OS APIs)
///
/// ## Forbidden Capabilities
/// - ❌ Retrying or sleeping (retry policy belongs to the host application)
/// - ❌ Caching previous snapshots (retained state belongs to `StateReconciler`)
/// - ❌ Deciding which changes are worth reporting
#[async_trait]
pub trait InterfaceSource: Send + Sync {
    /// Enumerate all interfaces currently visible to the host
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<InterfaceSnapshot>)`: Every adapter present right now
    /// - `Err(Error::Enumeration)`: No snapshot could be produced
    async fn enumerate(&self) -> Result<Vec<InterfaceSnapshot>, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing interface sources from configuration
pub trait InterfaceSourceFactory: Send + Sync {
    /// Create an InterfaceSource instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this source type
    ///
    /// # Returns
    ///
    /// A boxed InterfaceSource trait object
    fn create(
        &self,
        config: &crate::config::SourceConfig,
    ) -> Result<Box<dyn InterfaceSource>, crate::Error>;
}
