// # Interface Snapshot Model
//
// One network interface's identity and operational status as observed
// during a single reconciliation pass.
//
// Snapshots are plain values: two snapshots with equal fields are
// interchangeable. The reconciler keys its retained state by `id` and
// compares `status` to classify changes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operational status of an interface (RFC 2863 `ifOperStatus`)
///
/// Only [`OperStatus::Up`] counts as connected. Every other value is
/// classified as disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperStatus {
    Up,
    Down,
    Unknown,
    Testing,
    Dormant,
    NotPresent,
    LowerLayerDown,
}

impl OperStatus {
    /// Whether this status counts as connected
    pub fn is_up(self) -> bool {
        self == OperStatus::Up
    }

    /// Lowercase kernel spelling (as found in `/sys/class/net/*/operstate`)
    pub fn as_str(self) -> &'static str {
        match self {
            OperStatus::Up => "up",
            OperStatus::Down => "down",
            OperStatus::Unknown => "unknown",
            OperStatus::Testing => "testing",
            OperStatus::Dormant => "dormant",
            OperStatus::NotPresent => "notpresent",
            OperStatus::LowerLayerDown => "lowerlayerdown",
        }
    }
}

impl fmt::Display for OperStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperStatus {
    type Err = std::convert::Infallible;

    /// Parse a kernel operstate string. Unrecognised values map to `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s.trim().to_ascii_lowercase().as_str() {
            "up" => OperStatus::Up,
            "down" => OperStatus::Down,
            "testing" => OperStatus::Testing,
            "dormant" => OperStatus::Dormant,
            "notpresent" => OperStatus::NotPresent,
            "lowerlayerdown" => OperStatus::LowerLayerDown,
            _ => OperStatus::Unknown,
        };
        Ok(status)
    }
}

/// Anything that can describe a host network adapter
///
/// Platform bindings implement this for their native interface handles so
/// that [`InterfaceSnapshot::from_adapter`] can copy the fields out.
pub trait AdapterHandle {
    fn id(&self) -> String;
    fn name(&self) -> String;
    fn description(&self) -> String;
    fn status(&self) -> OperStatus;
}

/// Identity and status of one interface at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterfaceSnapshot {
    id: String,
    name: String,
    description: String,
    status: OperStatus,
}

impl InterfaceSnapshot {
    /// Create a snapshot from explicit fields
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        status: OperStatus,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            status,
        }
    }

    /// Copy the current fields of an adapter handle
    pub fn from_adapter<A: AdapterHandle + ?Sized>(adapter: &A) -> Self {
        Self::new(
            adapter.id(),
            adapter.name(),
            adapter.description(),
            adapter.status(),
        )
    }

    /// Stable OS-assigned identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable adapter name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-text description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Operational status when the snapshot was taken
    pub fn status(&self) -> OperStatus {
        self.status
    }

    /// Shorthand for `self.status().is_up()`
    pub fn is_up(&self) -> bool {
        self.status.is_up()
    }

    /// Same adapter with its status replaced
    ///
    /// Used by the reconciler to mark vanished adapters as down.
    pub(crate) fn with_status(mut self, status: OperStatus) -> Self {
        self.status = status;
        self
    }
}

impl fmt::Display for InterfaceSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] ({})", self.name, self.id, self.status)
    }
}
