//! The system statistics source consumed by the enumerators.
//!
//! Each query returns a flat record of named numeric fields, in the shape of
//! the classic psutil API (`cpu.Times`, `mem.VirtualMemory`, `net.IOCounters`,
//! `disk.Partitions`, `disk.Usage`, `load.Avg`).

use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Error returned by a statistics query.
#[derive(Debug)]
pub enum CollectError {
    /// I/O error reading a counter file or calling `statvfs`.
    Io { path: PathBuf, source: io::Error },
    /// Counter file had an unexpected format.
    Parse(String),
    /// A host parameter needed to interpret the counters is unknown.
    Unavailable(&'static str),
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            CollectError::Parse(msg) => write!(f, "parse error: {}", msg),
            CollectError::Unavailable(what) => write!(f, "{} unavailable", what),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Io { source, .. } => Some(source),
            CollectError::Parse(_) | CollectError::Unavailable(_) => None,
        }
    }
}

/// CPU time breakdown in seconds, for one core or for all cores combined.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CpuTimes {
    /// `cpu0`, `cpu1`, ... or `cpu-total` for the aggregate.
    pub cpu: String,
    pub user: f64,
    pub system: f64,
    pub idle: f64,
    pub nice: f64,
    pub iowait: f64,
    pub irq: f64,
    pub softirq: f64,
    pub steal: f64,
    pub guest: f64,
    pub guest_nice: f64,
}

/// Per-core CPU times and their total, taken from one reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CpuTimesReading {
    /// The kernel's own `cpu-total` line.
    pub total: CpuTimes,
    /// Cores in kernel order.
    pub per_cpu: Vec<CpuTimes>,
}

/// Virtual memory snapshot, sizes in bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VirtualMemory {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    /// `(total - available) / total * 100`.
    pub used_percent: f64,
    pub free: u64,
    pub active: u64,
    pub inactive: u64,
    pub buffers: u64,
    pub cached: u64,
}

/// I/O counters of one network interface, or the sum over all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetIoCounters {
    /// Interface name, or `all` for the aggregate.
    pub name: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub errout: u64,
    pub dropin: u64,
    pub dropout: u64,
}

/// Per-interface counters and their sum, taken from one reading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetIoReading {
    /// Field-wise sum over every interface, named `all`.
    pub total: NetIoCounters,
    /// Interfaces in `/proc/net/dev` order.
    pub per_nic: Vec<NetIoCounters>,
}

/// Netfilter connection tracking table counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConntrackStat {
    pub count: u64,
    pub max: u64,
}

/// Descriptive attributes of a network interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub hardware_addr: Option<String>,
    pub mtu: Option<u32>,
}

/// One mounted filesystem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
}

/// Space and inode usage of one mounted filesystem.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiskUsage {
    pub total: u64,
    pub free: u64,
    pub used: u64,
    pub used_percent: f64,
    pub inodes_total: u64,
    pub inodes_used: u64,
    pub inodes_free: u64,
    pub inodes_used_percent: f64,
}

/// System load averages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoadAvg {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

/// Source of host counters.
///
/// Every call reads the counters afresh; implementations never cache across
/// calls.
pub trait SystemStats: Send + Sync {
    /// Per-core CPU times and the total, from a single reading.
    fn cpu_times(&self) -> Result<CpuTimesReading, CollectError>;

    /// Current virtual memory snapshot.
    fn virtual_memory(&self) -> Result<VirtualMemory, CollectError>;

    /// Per-interface counters and their sum, from a single reading.
    fn net_io_counters(&self) -> Result<NetIoReading, CollectError>;

    /// Connection tracking counters.
    fn conntrack(&self) -> Result<ConntrackStat, CollectError>;

    /// Hardware address and MTU of an interface, where the host exposes them.
    fn interface_info(&self, name: &str) -> InterfaceInfo;

    /// Mounted filesystems. With `all` unset only physical devices are listed.
    fn partitions(&self, all: bool) -> Result<Vec<Partition>, CollectError>;

    /// Usage of the filesystem mounted at `path`.
    fn disk_usage(&self, path: &str) -> Result<DiskUsage, CollectError>;

    /// Load averages.
    fn load_avg(&self) -> Result<LoadAvg, CollectError>;
}
