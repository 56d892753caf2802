//! Sysfs interface source
//!
//! Every directory under `/sys/class/net` is one interface. The files read
//! per interface are:
//!
//! | File            | Used for                                 |
//! |-----------------|------------------------------------------|
//! | `ifindex`       | id (entries without one are skipped)     |
//! | `operstate`     | status (entries without one are skipped) |
//! | `ifalias`       | description, when set                    |
//! | `device/driver` | description fallback (symlink file name) |
//! | `type`          | loopback detection (`ARPHRD_LOOPBACK`)   |

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use linkwatch_core::config::DEFAULT_SYSFS_ROOT;
use linkwatch_core::traits::InterfaceSource;
use linkwatch_core::{AdapterHandle, Error, InterfaceSnapshot, OperStatus};
use tracing::debug;

/// `ARPHRD_LOOPBACK` from `<linux/if_arp.h>`
const ARPHRD_LOOPBACK: u16 = 772;

/// Interface source reading `/sys/class/net`
#[derive(Debug, Clone)]
pub struct SysfsInterfaceSource {
    root: PathBuf,
    include_loopback: bool,
}

impl SysfsInterfaceSource {
    /// Source over the real `/sys/class/net`, loopback excluded
    pub fn new() -> Self {
        Self::with_root(DEFAULT_SYSFS_ROOT)
    }

    /// Source over another directory laid out like `/sys/class/net`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include_loopback: false,
        }
    }

    /// Report the loopback interface too
    pub fn include_loopback(mut self, include: bool) -> Self {
        self.include_loopback = include;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read one interface directory
    ///
    /// Returns `Ok(None)` for entries that are not interfaces, or that
    /// vanished while being read. Every live interface has both `ifindex`
    /// and `operstate`, so a missing attribute means the entry is gone.
    async fn read_interface(&self, name: String) -> io::Result<Option<SysfsInterface>> {
        let dir = self.root.join(&name);

        let index = match read_attr(&dir, "ifindex").await? {
            Some(raw) => match raw.parse::<u32>() {
                Ok(index) => index,
                Err(_) => {
                    debug!(interface = %name, "Ignoring unparsable ifindex {:?}", raw);
                    return Ok(None);
                }
            },
            None => return Ok(None),
        };

        let link_type = read_attr(&dir, "type")
            .await?
            .and_then(|raw| raw.parse::<u16>().ok());
        if link_type == Some(ARPHRD_LOOPBACK) && !self.include_loopback {
            return Ok(None);
        }

        let status = match read_attr(&dir, "operstate").await? {
            Some(raw) => raw.parse::<OperStatus>().unwrap_or(OperStatus::Unknown),
            None => {
                debug!(interface = %name, "Interface vanished during enumeration");
                return Ok(None);
            }
        };
        let alias = read_attr(&dir, "ifalias").await?.filter(|a| !a.is_empty());
        let driver = tokio::fs::read_link(dir.join("device/driver"))
            .await
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()));

        Ok(Some(SysfsInterface {
            index,
            name,
            alias,
            driver,
            status,
        }))
    }
}

impl Default for SysfsInterfaceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InterfaceSource for SysfsInterfaceSource {
    async fn enumerate(&self) -> Result<Vec<InterfaceSnapshot>, Error> {
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            Error::enumeration(format!("cannot read {}: {}", self.root.display(), e))
        })?;

        let mut interfaces = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(Error::enumeration(format!(
                        "cannot list {}: {}",
                        self.root.display(),
                        e
                    )));
                }
            };
            let name = entry.file_name().to_string_lossy().to_string();

            match self.read_interface(name.clone()).await {
                Ok(Some(interface)) => interfaces.push(interface),
                Ok(None) => {}
                Err(e) => {
                    return Err(Error::enumeration(format!("cannot read {}: {}", name, e)));
                }
            }
        }

        interfaces.sort_by_key(|interface| interface.index);
        Ok(interfaces.iter().map(InterfaceSnapshot::from_adapter).collect())
    }

    fn source_name(&self) -> &'static str {
        "sysfs"
    }
}

/// Attributes of one `/sys/class/net/<name>` directory
#[derive(Debug)]
struct SysfsInterface {
    index: u32,
    name: String,
    alias: Option<String>,
    driver: Option<String>,
    status: OperStatus,
}

impl AdapterHandle for SysfsInterface {
    fn id(&self) -> String {
        self.index.to_string()
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        self.alias
            .as_ref()
            .or(self.driver.as_ref())
            .unwrap_or(&self.name)
            .clone()
    }

    fn status(&self) -> OperStatus {
        self.status
    }
}

/// Read and trim one attribute file
///
/// Missing files, entries that are not directories, and attributes a driver
/// refuses to report (`EINVAL`) read as `None`.
async fn read_attr(dir: &Path, attr: &str) -> io::Result<Option<String>> {
    match tokio::fs::read_to_string(dir.join(attr)).await {
        Ok(raw) => Ok(Some(raw.trim().to_string())),
        Err(e) if is_absent(&e) => Ok(None),
        Err(e) => Err(e),
    }
}

fn is_absent(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory | io::ErrorKind::InvalidInput
    )
}
