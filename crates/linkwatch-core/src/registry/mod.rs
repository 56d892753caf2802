//! Plugin-based collaborator registry
//!
//! The registry lets interface sources and change signals be registered
//! by type name at runtime, so the daemon can build them from
//! configuration without hardcoded if-else chains.
//!
//! ## Registration
//!
//! Implementation crates expose a `register()` function:
//!
//! ```rust,ignore
//! // In the linkwatch-netlink crate
//! pub fn register(registry: &SourceRegistry) {
//!     registry.register_source("sysfs", Box::new(SysfsSourceFactory));
//!     registry.register_signal("netlink", Box::new(NetlinkSignalFactory));
//! }
//! ```

use crate::config::{SignalConfig, SourceConfig};
use crate::error::{Error, Result};
use crate::traits::{ChangeSignal, ChangeSignalFactory, InterfaceSource, InterfaceSourceFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Registry of interface source and change signal factories
///
/// ## Thread Safety
///
/// Interior mutability with RwLock: concurrent lookups, exclusive
/// registration.
#[derive(Default)]
pub struct SourceRegistry {
    /// Registered interface source factories
    sources: RwLock<HashMap<String, Box<dyn InterfaceSourceFactory>>>,

    /// Registered change signal factories
    signals: RwLock<HashMap<String, Box<dyn ChangeSignalFactory>>>,
}

impl SourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interface source factory
    ///
    /// # Parameters
    ///
    /// - `name`: Source type name (e.g., "sysfs")
    /// - `factory`: Factory object for creating source instances
    pub fn register_source(
        &self,
        name: impl Into<String>,
        factory: Box<dyn InterfaceSourceFactory>,
    ) {
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        sources.insert(name.into(), factory);
    }

    /// Register a change signal factory
    ///
    /// # Parameters
    ///
    /// - `name`: Signal type name (e.g., "netlink")
    /// - `factory`: Factory object for creating signal instances
    pub fn register_signal(&self, name: impl Into<String>, factory: Box<dyn ChangeSignalFactory>) {
        let mut signals = self.signals.write().unwrap_or_else(PoisonError::into_inner);
        signals.insert(name.into(), factory);
    }

    /// Create an interface source from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn InterfaceSource>)`: Created source instance
    /// - `Err(Error)`: If the source type is not registered or creation fails
    pub fn create_source(&self, config: &SourceConfig) -> Result<Box<dyn InterfaceSource>> {
        let source_type = config.type_name();
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);

        let factory = sources.get(source_type).ok_or_else(|| {
            Error::config(format!("Unknown interface source type: {}", source_type))
        })?;

        factory.create(config)
    }

    /// Create a change signal from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ChangeSignal>)`: Created signal instance
    /// - `Err(Error)`: If the signal type is not registered or creation fails
    pub fn create_signal(&self, config: &SignalConfig) -> Result<Box<dyn ChangeSignal>> {
        let signal_type = config.type_name();
        let signals = self.signals.read().unwrap_or_else(PoisonError::into_inner);

        let factory = signals.get(signal_type).ok_or_else(|| {
            Error::config(format!("Unknown change signal type: {}", signal_type))
        })?;

        factory.create(config)
    }

    /// List all registered source types
    pub fn list_sources(&self) -> Vec<String> {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.keys().cloned().collect()
    }

    /// List all registered signal types
    pub fn list_signals(&self) -> Vec<String> {
        let signals = self.signals.read().unwrap_or_else(PoisonError::into_inner);
        signals.keys().cloned().collect()
    }

    /// Check if a source type is registered
    pub fn has_source(&self, name: &str) -> bool {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.contains_key(name)
    }

    /// Check if a signal type is registered
    pub fn has_signal(&self, name: &str) -> bool {
        let signals = self.signals.read().unwrap_or_else(PoisonError::into_inner);
        signals.contains_key(name)
    }
}
