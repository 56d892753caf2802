//! Collaborator traits for the linkwatch system
//!
//! The reconciler depends on two external collaborators:
//!
//! - [`InterfaceSource`]: Enumerate interfaces and their operational status
//! - [`ChangeSignal`]: Notify that the network configuration may have changed

pub mod interface_source;
pub mod change_signal;

pub use interface_source::{InterfaceSource, InterfaceSourceFactory};
pub use change_signal::{ChangeSignal, ChangeSignalFactory, ChangeStream};
