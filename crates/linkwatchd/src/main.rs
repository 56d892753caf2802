// # linkwatchd - Interface Watch Daemon
//
// This daemon is a thin integration layer:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering interface sources and change signals
// 4. Logging every interface event until SIGTERM/SIGINT
//
// All reconciliation logic lives in linkwatch-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Interface Source
// - `LINKWATCH_SOURCE_TYPE`: Type of interface source (sysfs)
// - `LINKWATCH_SYSFS_ROOT`: Directory to enumerate (default `/sys/class/net`)
// - `LINKWATCH_INCLUDE_LOOPBACK`: Report the loopback interface (default false)
//
// ### Change Signal
// - `LINKWATCH_SIGNAL_TYPE`: Type of change signal (netlink)
// - `LINKWATCH_WATCH_ADDRESSES`: Also react to address changes (default true)
//
// ### Reconciler
// - `LINKWATCH_SUPPRESS_GUID_NAMES`: Withhold events for GUID-named adapters (default true)
//
// ### Logging
// - `LINKWATCH_LOG_LEVEL`: trace, debug, info, warn or error (default info)
//
// ## Example
//
// ```bash
// export LINKWATCH_INCLUDE_LOOPBACK=true
// export LINKWATCH_LOG_LEVEL=debug
//
// linkwatchd
// ```

use anyhow::Result;
use linkwatch_core::{
    InterfaceSnapshot, LinkwatchConfig, ReconcilerConfig, SignalConfig, SourceConfig,
    SourceRegistry, StateReconciler,
};
use std::env;
use std::process::ExitCode;
use tokio::sync::oneshot;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum LinkwatchExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<LinkwatchExitCode> for ExitCode {
    fn from(code: LinkwatchExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    source_type: String,
    sysfs_root: Option<String>,
    include_loopback: bool,
    signal_type: String,
    watch_addresses: bool,
    suppress_guid_names: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            source_type: lookup("LINKWATCH_SOURCE_TYPE").unwrap_or_else(|| "sysfs".to_string()),
            sysfs_root: lookup("LINKWATCH_SYSFS_ROOT"),
            include_loopback: parse_flag(
                "LINKWATCH_INCLUDE_LOOPBACK",
                lookup("LINKWATCH_INCLUDE_LOOPBACK"),
                false,
            )?,
            signal_type: lookup("LINKWATCH_SIGNAL_TYPE").unwrap_or_else(|| "netlink".to_string()),
            watch_addresses: parse_flag(
                "LINKWATCH_WATCH_ADDRESSES",
                lookup("LINKWATCH_WATCH_ADDRESSES"),
                true,
            )?,
            suppress_guid_names: parse_flag(
                "LINKWATCH_SUPPRESS_GUID_NAMES",
                lookup("LINKWATCH_SUPPRESS_GUID_NAMES"),
                true,
            )?,
            log_level: lookup("LINKWATCH_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.source_type.as_str() {
            "sysfs" => {}
            _ => anyhow::bail!(
                "LINKWATCH_SOURCE_TYPE '{}' is not supported. \
                Supported types: sysfs",
                self.source_type
            ),
        }

        match self.signal_type.as_str() {
            "netlink" => {}
            _ => anyhow::bail!(
                "LINKWATCH_SIGNAL_TYPE '{}' is not supported. \
                Supported types: netlink",
                self.signal_type
            ),
        }

        if let Some(ref root) = self.sysfs_root
            && !root.is_empty()
            && !std::path::Path::new(root).is_dir()
        {
            anyhow::bail!("LINKWATCH_SYSFS_ROOT is not a directory: {}", root);
        }

        if log_level(&self.log_level).is_none() {
            anyhow::bail!(
                "LINKWATCH_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            );
        }

        self.linkwatch_config().validate()?;
        Ok(())
    }

    /// Library configuration equivalent to these settings
    fn linkwatch_config(&self) -> LinkwatchConfig {
        LinkwatchConfig {
            source: SourceConfig::Sysfs {
                root: self.sysfs_root.clone(),
                include_loopback: self.include_loopback,
            },
            signal: SignalConfig::Netlink {
                watch_addresses: self.watch_addresses,
            },
            reconciler: ReconcilerConfig::default()
                .with_suppress_guid_named_adapters(self.suppress_guid_names),
        }
    }
}

/// Parse a boolean environment value
fn parse_flag(key: &str, value: Option<String>, default: bool) -> Result<bool> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{} must be true or false. Got: {}", key, other),
    }
}

fn log_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return LinkwatchExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return LinkwatchExitCode::ConfigError.into();
    }

    // Initialize tracing
    let level = log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return LinkwatchExitCode::ConfigError.into();
    }

    info!("Starting linkwatchd daemon");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return LinkwatchExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => LinkwatchExitCode::CleanShutdown,
            Err(DaemonError::Startup(e)) => {
                error!("Startup failed: {}", e);
                LinkwatchExitCode::ConfigError
            }
            Err(DaemonError::Runtime(e)) => {
                error!("Daemon error: {}", e);
                LinkwatchExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Which phase a daemon failure happened in
enum DaemonError {
    Startup(anyhow::Error),
    Runtime(anyhow::Error),
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<(), DaemonError> {
    let reconciler = start(&config).await.map_err(DaemonError::Startup)?;
    let shutdown_rx = install_shutdown_handler().map_err(DaemonError::Startup)?;

    info!("Ready to monitor interface changes");
    reconciler
        .run_with_shutdown(Some(shutdown_rx))
        .await
        .map_err(|e| DaemonError::Runtime(e.into()))?;

    info!("Shutting down daemon");
    Ok(())
}

/// Build collaborators from configuration and seed the reconciler
async fn start(config: &Config) -> Result<StateReconciler> {
    let settings = config.linkwatch_config();

    // Create collaborator registry
    let registry = SourceRegistry::new();

    #[cfg(feature = "netlink")]
    {
        info!("Registering sysfs source and netlink signal");
        linkwatch_netlink::register(&registry);
    }

    #[cfg(not(feature = "netlink"))]
    {
        tracing::warn!("Built without the netlink feature; no interface source is available");
    }

    let source = registry.create_source(&settings.source)?;
    let signal = registry.create_signal(&settings.signal)?;
    info!(
        source = source.source_name(),
        signal = signal.signal_name(),
        suppress_guid_names = settings.reconciler.suppress_guid_named_adapters,
        "Collaborators created"
    );

    let reconciler = StateReconciler::new(source, signal, settings.reconciler).await?;

    let mut interfaces = reconciler.current_state();
    interfaces.sort_by(|a, b| a.name().cmp(b.name()));
    for nic in &interfaces {
        info!(
            id = nic.id(),
            status = %nic.status(),
            "Interface {}: {}",
            nic.name(),
            nic.description()
        );
    }

    reconciler.on_discovered(|_, nic| log_event("discovered", nic));
    reconciler.on_connected(|_, nic| log_event("connected", nic));
    reconciler.on_disconnected(|_, nic| log_event("disconnected", nic));

    Ok(reconciler)
}

fn log_event(event: &str, nic: &InterfaceSnapshot) {
    info!(
        id = nic.id(),
        status = %nic.status(),
        "Interface {} {} ({})",
        nic.name(),
        event,
        nic.description()
    );
}

/// Install SIGTERM/SIGINT handlers
///
/// The returned receiver fires on the first signal.
#[cfg(unix)]
fn install_shutdown_handler() -> Result<oneshot::Receiver<()>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("Received shutdown signal: {}", name);
        let _ = tx.send(());
    });
    Ok(rx)
}

/// Install a Ctrl-C handler
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn install_shutdown_handler() -> Result<oneshot::Receiver<()>> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal: SIGINT"),
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
        let _ = tx.send(());
    });
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.source_type, "sysfs");
        assert_eq!(config.signal_type, "netlink");
        assert!(!config.include_loopback);
        assert!(config.watch_addresses);
        assert!(config.suppress_guid_names);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_flags() {
        let config = config_from(&[
            ("LINKWATCH_INCLUDE_LOOPBACK", "yes"),
            ("LINKWATCH_WATCH_ADDRESSES", "0"),
            ("LINKWATCH_SUPPRESS_GUID_NAMES", "False"),
        ])
        .unwrap();
        assert!(config.include_loopback);
        assert!(!config.watch_addresses);
        assert!(!config.suppress_guid_names);

        let settings = config.linkwatch_config();
        assert!(!settings.reconciler.suppress_guid_named_adapters);
        assert!(matches!(
            settings.signal,
            SignalConfig::Netlink {
                watch_addresses: false
            }
        ));

        let err = config_from(&[("LINKWATCH_INCLUDE_LOOPBACK", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("LINKWATCH_INCLUDE_LOOPBACK"));
    }

    #[test]
    fn test_validation() {
        let config = config_from(&[("LINKWATCH_SOURCE_TYPE", "wmi")]).unwrap();
        assert!(config.validate().is_err());

        let config = config_from(&[("LINKWATCH_LOG_LEVEL", "verbose")]).unwrap();
        assert!(config.validate().is_err());

        let config = config_from(&[("LINKWATCH_SYSFS_ROOT", "/nonexistent/linkwatch")]).unwrap();
        assert!(config.validate().is_err());

        let config = config_from(&[("LINKWATCH_SYSFS_ROOT", "")]).unwrap();
        assert!(config.validate().is_err());
    }
}
