// # Linux Interface Collaborators
//
// This crate provides the Linux implementations of the linkwatch traits:
//
// - `SysfsInterfaceSource`: enumerates `/sys/class/net`
// - `NetlinkChangeSignal`: listens to rtnetlink link/address notifications
//
// ## Platform Support
//
// The sysfs source only needs a directory laid out like `/sys/class/net`,
// so it builds everywhere (tests use a fake tree). The netlink signal is
// Linux-only; elsewhere its factory reports a configuration error.

pub mod sysfs;

#[cfg(target_os = "linux")]
pub mod netlink;

use linkwatch_core::config::{DEFAULT_SYSFS_ROOT, SignalConfig, SourceConfig};
use linkwatch_core::traits::{
    ChangeSignal, ChangeSignalFactory, InterfaceSource, InterfaceSourceFactory,
};
use linkwatch_core::{Error, Result, SourceRegistry};

pub use sysfs::SysfsInterfaceSource;

#[cfg(target_os = "linux")]
pub use netlink::NetlinkChangeSignal;

/// Factory for creating sysfs interface sources
pub struct SysfsSourceFactory;

impl InterfaceSourceFactory for SysfsSourceFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn InterfaceSource>> {
        match config {
            SourceConfig::Sysfs {
                root,
                include_loopback,
            } => {
                let root = root.as_deref().unwrap_or(DEFAULT_SYSFS_ROOT);
                Ok(Box::new(
                    SysfsInterfaceSource::with_root(root).include_loopback(*include_loopback),
                ))
            }
            _ => Err(Error::config("Invalid config for sysfs interface source")),
        }
    }
}

/// Factory for creating netlink change signals
pub struct NetlinkSignalFactory;

#[cfg(target_os = "linux")]
impl ChangeSignalFactory for NetlinkSignalFactory {
    fn create(&self, config: &SignalConfig) -> Result<Box<dyn ChangeSignal>> {
        match config {
            SignalConfig::Netlink { watch_addresses } => {
                Ok(Box::new(NetlinkChangeSignal::new(*watch_addresses)))
            }
            _ => Err(Error::config("Invalid config for netlink change signal")),
        }
    }
}

#[cfg(not(target_os = "linux"))]
impl ChangeSignalFactory for NetlinkSignalFactory {
    fn create(&self, _config: &SignalConfig) -> Result<Box<dyn ChangeSignal>> {
        Err(Error::config(
            "Netlink change signal is only supported on Linux",
        ))
    }
}

/// Register the sysfs source and netlink signal with a registry
pub fn register(registry: &SourceRegistry) {
    registry.register_source("sysfs", Box::new(SysfsSourceFactory));
    registry.register_signal("netlink", Box::new(NetlinkSignalFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register() {
        let registry = SourceRegistry::new();
        register(&registry);

        assert!(registry.has_source("sysfs"));
        assert!(registry.has_signal("netlink"));
    }

    #[test]
    fn test_sysfs_factory_creation() {
        let registry = SourceRegistry::new();
        register(&registry);

        let config = SourceConfig::Sysfs {
            root: Some("/tmp/fake-net".to_string()),
            include_loopback: true,
        };
        let source = registry.create_source(&config).unwrap();
        assert_eq!(source.source_name(), "sysfs");
    }

    #[test]
    fn test_factories_reject_foreign_config() {
        let config = SourceConfig::Custom {
            factory: "sysfs".to_string(),
            config: serde_json::json!({}),
        };
        assert!(SysfsSourceFactory.create(&config).is_err());

        let config = SignalConfig::Custom {
            factory: "netlink".to_string(),
            config: serde_json::json!({}),
        };
        assert!(NetlinkSignalFactory.create(&config).is_err());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_netlink_factory_creation() {
        let signal = NetlinkSignalFactory
            .create(&SignalConfig::default())
            .unwrap();
        assert_eq!(signal.signal_name(), "netlink");
    }

    #[test]
    #[cfg(not(target_os = "linux"))]
    fn test_netlink_factory_unsupported() {
        assert!(NetlinkSignalFactory.create(&SignalConfig::default()).is_err());
    }
}
