//! Error types for the linkwatch system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for linkwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the linkwatch system
#[derive(Error, Debug)]
pub enum Error {
    /// The interface source could not produce a snapshot
    ///
    /// A pass that hits this error is aborted before retained state is
    /// touched and before any listener is notified.
    #[error("Interface enumeration failed: {0}")]
    Enumeration(String),

    /// A registered listener panicked while being notified
    #[error("Listener for {event} events failed: {message}")]
    Listener {
        /// Event kind being delivered
        event: &'static str,
        /// Panic payload, when it was a string
        message: String,
    },

    /// Change signal subscription errors
    #[error("Change signal error: {0}")]
    ChangeSignal(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (sysfs reads, netlink sockets)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an enumeration error
    pub fn enumeration(msg: impl Into<String>) -> Self {
        Self::Enumeration(msg.into())
    }

    /// Create a listener error
    pub fn listener(event: &'static str, message: impl Into<String>) -> Self {
        Self::Listener {
            event,
            message: message.into(),
        }
    }

    /// Create a change signal error
    pub fn change_signal(msg: impl Into<String>) -> Self {
        Self::ChangeSignal(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error aborted a reconciliation pass
    pub fn is_enumeration(&self) -> bool {
        matches!(self, Self::Enumeration(_))
    }
}
