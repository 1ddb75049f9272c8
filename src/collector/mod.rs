//! Host statistics source.
//!
//! This module provides the counters behind every metric: the [`SystemStats`]
//! trait with its `/proc` implementation, and the filesystem abstraction that
//! lets the same code run against a [`MockFs`] in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  SystemStats (trait)                        │
//! │  cpu_times · virtual_memory · net_io_counters · conntrack   │
//! │  partitions · disk_usage · load_avg                         │
//! └────────────────────────────┬────────────────────────────────┘
//!                              │
//!                      ┌───────▼───────┐
//!                      │  ProcfsStats  │  /proc/stat, /proc/meminfo,
//!                      │               │  /proc/net/dev, /proc/loadavg,
//!                      │               │  /proc/self/mounts, /sys/class/net
//!                      └───────┬───────┘
//!                              │
//!                       ┌──────▼──────┐
//!                       │  FileSystem │ (trait, incl. statvfs)
//!                       └──────┬──────┘
//!              ┌───────────────┴───────────────┐
//!       ┌──────▼──────┐                 ┌──────▼──────┐
//!       │   RealFs    │                 │   MockFs    │
//!       │ (Linux)     │                 │ (Testing)   │
//!       └─────────────┘                 └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use psutil_collector::collector::{MockFs, ProcfsStats, SystemStats};
//!
//! let stats = ProcfsStats::new(MockFs::typical_system(), "/proc").with_clock_ticks(100);
//! let cpus = stats.cpu_times().unwrap();
//! assert_eq!(cpus.per_cpu.len(), 4);
//! assert_eq!(cpus.total.cpu, "cpu-total");
//! ```

pub mod mock;
pub mod procfs;
pub mod stats;
pub mod traits;

pub use mock::MockFs;
pub use procfs::ProcfsStats;
pub use stats::{
    CollectError, ConntrackStat, CpuTimes, CpuTimesReading, DiskUsage, InterfaceInfo, LoadAvg,
    NetIoCounters, NetIoReading, Partition, SystemStats, VirtualMemory,
};
pub use traits::{FileSystem, FsUsage, RealFs};
