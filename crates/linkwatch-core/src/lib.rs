// # linkwatch-core
//
// Core library for watching host network interfaces.
//
// ## Architecture Overview
//
// This library provides the core functionality for interface state tracking:
// - **InterfaceSnapshot**: Value type describing one adapter at one point in time
// - **InterfaceSource**: Trait for enumerating the host's interfaces
// - **ChangeSignal**: Trait for learning that the network configuration may have changed
// - **StateReconciler**: Diffs snapshots against retained state and notifies listeners
// - **SourceRegistry**: Plugin-based registry for sources and signals
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Platform access lives behind traits, outside the core
// 2. **Event-Driven**: Live passes run only when the change signal fires
// 3. **Silent Start**: The initializing pass seeds state without notifying anyone
// 4. **At-Least-Once-Seen**: Adapters never leave retained state; vanished ones read as down
// 5. **Library-First**: The daemon is a thin shell over this crate

pub mod traits;
pub mod snapshot;
pub mod filter;
pub mod reconciler;
pub mod registry;
pub mod config;
pub mod error;
pub mod memory;

// Re-export core types for convenience
pub use traits::{ChangeSignal, InterfaceSource};
pub use snapshot::{AdapterHandle, InterfaceSnapshot, OperStatus};
pub use reconciler::{
    InterfaceEvent, InterfaceEventKind, ListenerId, PassKind, PassReport, StateReconciler,
};
pub use registry::SourceRegistry;
pub use config::{LinkwatchConfig, ReconcilerConfig, SignalConfig, SourceConfig};
pub use error::{Error, Result};
pub use memory::{ManualChangeSignal, MemoryInterfaceSource};
