//! Configuration types for the linkwatch system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Default sysfs directory listing network interfaces
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/net";

/// Main linkwatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkwatchConfig {
    /// Interface source configuration
    #[serde(default)]
    pub source: SourceConfig,

    /// Change signal configuration
    #[serde(default)]
    pub signal: SignalConfig,

    /// Reconciler settings
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

impl LinkwatchConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.source.validate()?;
        self.signal.validate()?;
        Ok(())
    }
}

/// Interface source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Enumerate `/sys/class/net` (Linux)
    Sysfs {
        /// Directory to enumerate instead of `/sys/class/net`
        #[serde(default)]
        root: Option<String>,
        /// Report the loopback interface too
        #[serde(default)]
        include_loopback: bool,
    },

    /// Custom interface source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl SourceConfig {
    /// Validate the source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SourceConfig::Sysfs { root, .. } => {
                if root.as_deref().is_some_and(str::is_empty) {
                    return Err(crate::Error::config("Sysfs root cannot be empty"));
                }
                Ok(())
            }
            SourceConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom interface source factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom interface source config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the source type name
    pub fn type_name(&self) -> &str {
        match self {
            SourceConfig::Sysfs { .. } => "sysfs",
            SourceConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Sysfs {
            root: None,
            include_loopback: false,
        }
    }
}

/// Change signal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalConfig {
    /// rtnetlink multicast notifications (Linux)
    Netlink {
        /// Also fire on IPv4/IPv6 address changes, not only link changes
        #[serde(default = "default_watch_addresses")]
        watch_addresses: bool,
    },

    /// Custom change signal
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl SignalConfig {
    /// Validate the signal configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SignalConfig::Netlink { .. } => Ok(()),
            SignalConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom change signal factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom change signal config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the signal type name
    pub fn type_name(&self) -> &str {
        match self {
            SignalConfig::Netlink { .. } => "netlink",
            SignalConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig::Netlink {
            watch_addresses: default_watch_addresses(),
        }
    }
}

fn default_watch_addresses() -> bool {
    true
}

/// Reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Suppress notifications for adapters whose name contains a GUID
    ///
    /// Retained state is updated either way; only listener delivery is
    /// affected. Can be changed at runtime with
    /// `StateReconciler::set_suppress_guid_named_adapters`.
    #[serde(default = "default_suppress_guid_named_adapters")]
    pub suppress_guid_named_adapters: bool,
}

impl ReconcilerConfig {
    /// Set the GUID suppression flag
    pub fn with_suppress_guid_named_adapters(mut self, suppress: bool) -> Self {
        self.suppress_guid_named_adapters = suppress;
        self
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            suppress_guid_named_adapters: default_suppress_guid_named_adapters(),
        }
    }
}

fn default_suppress_guid_named_adapters() -> bool {
    true
}
