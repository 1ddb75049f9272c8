//! Statistics source reading Linux `/proc` and `/sys`.

use crate::collector::procfs::parser::{
    CpuStat, ParseError, parse_counter, parse_cpu_stat, parse_loadavg, parse_meminfo,
    parse_mounts, parse_net_dev, parse_physical_fstypes,
};
use crate::collector::stats::{
    CollectError, ConntrackStat, CpuTimes, CpuTimesReading, DiskUsage, InterfaceInfo, LoadAvg,
    NetIoCounters, NetIoReading, Partition, SystemStats, VirtualMemory,
};
use crate::collector::traits::FileSystem;
use std::path::{Path, PathBuf};

impl From<ParseError> for CollectError {
    fn from(e: ParseError) -> Self {
        CollectError::Parse(e.message)
    }
}

/// Clock ticks per second (USER_HZ) of the running kernel.
#[cfg(unix)]
fn host_clock_ticks() -> Option<u64> {
    // SAFETY: sysconf has no preconditions and only reads configuration.
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    u64::try_from(ticks).ok().filter(|t| *t > 0)
}

#[cfg(not(unix))]
fn host_clock_ticks() -> Option<u64> {
    None
}

/// Implements [`SystemStats`] on top of `/proc` and `/sys`.
pub struct ProcfsStats<F: FileSystem> {
    fs: F,
    proc_path: String,
    sys_path: String,
    clock_ticks: Option<u64>,
}

impl<F: FileSystem> ProcfsStats<F> {
    /// Creates a new statistics source.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            sys_path: "/sys".to_string(),
            clock_ticks: host_clock_ticks(),
        }
    }

    /// Overrides the sysfs base path (default "/sys").
    pub fn with_sys_path(mut self, sys_path: impl Into<String>) -> Self {
        self.sys_path = sys_path.into();
        self
    }

    /// Overrides the clock tick rate used to convert `/proc/stat` jiffies,
    /// for reading counters captured on another host.
    pub fn with_clock_ticks(mut self, ticks: u64) -> Self {
        self.clock_ticks = Some(ticks).filter(|t| *t > 0);
        self
    }

    fn read(&self, path: PathBuf) -> Result<String, CollectError> {
        self.fs
            .read_to_string(&path)
            .map_err(|source| CollectError::Io { path, source })
    }

    fn read_proc(&self, relative: &str) -> Result<String, CollectError> {
        self.read(Path::new(&self.proc_path).join(relative))
    }

    fn mounts(&self) -> Result<Vec<Partition>, CollectError> {
        let content = self.read_proc("self/mounts")?;
        Ok(parse_mounts(&content)?
            .into_iter()
            .map(|m| Partition {
                device: m.device,
                mountpoint: m.mountpoint,
                fstype: m.fstype,
            })
            .collect())
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn to_cpu_times(cpu: &CpuStat, ticks: f64) -> CpuTimes {
    let secs = |jiffies: u64| jiffies as f64 / ticks;
    CpuTimes {
        cpu: match cpu.cpu_id {
            Some(id) => format!("cpu{}", id),
            None => "cpu-total".to_string(),
        },
        user: secs(cpu.user),
        system: secs(cpu.system),
        idle: secs(cpu.idle),
        nice: secs(cpu.nice),
        iowait: secs(cpu.iowait),
        irq: secs(cpu.irq),
        softirq: secs(cpu.softirq),
        steal: secs(cpu.steal),
        guest: secs(cpu.guest),
        guest_nice: secs(cpu.guest_nice),
    }
}

impl<F: FileSystem> SystemStats for ProcfsStats<F> {
    fn cpu_times(&self) -> Result<CpuTimesReading, CollectError> {
        let ticks = self
            .clock_ticks
            .ok_or(CollectError::Unavailable("clock ticks per second"))? as f64;
        let content = self.read_proc("stat")?;

        let mut total = None;
        let mut per_cpu = Vec::new();
        for cpu in parse_cpu_stat(&content)? {
            let times = to_cpu_times(&cpu, ticks);
            match cpu.cpu_id {
                Some(_) => per_cpu.push(times),
                None => total = Some(times),
            }
        }

        let total =
            total.ok_or_else(|| CollectError::Parse("no aggregate cpu line in stat".to_string()))?;
        Ok(CpuTimesReading { total, per_cpu })
    }

    fn virtual_memory(&self) -> Result<VirtualMemory, CollectError> {
        let content = self.read_proc("meminfo")?;
        let info = parse_meminfo(&content)?;

        let kb = |v: u64| v * 1024;
        let used = info
            .mem_total
            .saturating_sub(info.mem_free)
            .saturating_sub(info.buffers)
            .saturating_sub(info.cached);
        // Kernels before 3.14 do not export MemAvailable; estimate it the way
        // `free` did then.
        let available = info
            .mem_available
            .unwrap_or(info.mem_free + info.buffers + info.cached);

        Ok(VirtualMemory {
            total: kb(info.mem_total),
            available: kb(available),
            used: kb(used),
            used_percent: percent(info.mem_total.saturating_sub(available), info.mem_total),
            free: kb(info.mem_free),
            active: kb(info.active),
            inactive: kb(info.inactive),
            buffers: kb(info.buffers),
            cached: kb(info.cached),
        })
    }

    fn net_io_counters(&self) -> Result<NetIoReading, CollectError> {
        let content = self.read_proc("net/dev")?;
        let devices = parse_net_dev(&content)?;

        let per_nic: Vec<NetIoCounters> = devices
            .into_iter()
            .map(|dev| NetIoCounters {
                name: dev.interface,
                bytes_sent: dev.tx_bytes,
                bytes_recv: dev.rx_bytes,
                packets_sent: dev.tx_packets,
                packets_recv: dev.rx_packets,
                errin: dev.rx_errs,
                errout: dev.tx_errs,
                dropin: dev.rx_drop,
                dropout: dev.tx_drop,
            })
            .collect();

        let total = per_nic.iter().fold(
            NetIoCounters {
                name: "all".to_string(),
                ..NetIoCounters::default()
            },
            |mut acc, nic| {
                acc.bytes_sent += nic.bytes_sent;
                acc.bytes_recv += nic.bytes_recv;
                acc.packets_sent += nic.packets_sent;
                acc.packets_recv += nic.packets_recv;
                acc.errin += nic.errin;
                acc.errout += nic.errout;
                acc.dropin += nic.dropin;
                acc.dropout += nic.dropout;
                acc
            },
        );

        Ok(NetIoReading { total, per_nic })
    }

    fn conntrack(&self) -> Result<ConntrackStat, CollectError> {
        let count = parse_counter(&self.read_proc("sys/net/netfilter/nf_conntrack_count")?)?;
        let max = parse_counter(&self.read_proc("sys/net/netfilter/nf_conntrack_max")?)?;
        Ok(ConntrackStat { count, max })
    }

    fn interface_info(&self, name: &str) -> InterfaceInfo {
        let base = Path::new(&self.sys_path).join("class/net").join(name);
        let hardware_addr = self
            .fs
            .read_to_string(&base.join("address"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let mtu = self
            .fs
            .read_to_string(&base.join("mtu"))
            .ok()
            .and_then(|s| s.trim().parse().ok());

        InterfaceInfo { hardware_addr, mtu }
    }

    fn partitions(&self, all: bool) -> Result<Vec<Partition>, CollectError> {
        let mounts = self.mounts()?;
        if all {
            return Ok(mounts);
        }

        let physical = parse_physical_fstypes(&self.read_proc("filesystems")?);
        Ok(mounts
            .into_iter()
            .filter(|m| physical.contains(&m.fstype))
            .collect())
    }

    fn disk_usage(&self, path: &str) -> Result<DiskUsage, CollectError> {
        let usage = self
            .fs
            .statvfs(Path::new(path))
            .map_err(|source| CollectError::Io {
                path: PathBuf::from(path),
                source,
            })?;

        let total = usage.blocks * usage.block_size;
        let free = usage.blocks_available * usage.block_size;
        let used = usage.blocks.saturating_sub(usage.blocks_free) * usage.block_size;
        let inodes_used = usage.files.saturating_sub(usage.files_free);

        Ok(DiskUsage {
            total,
            free,
            used,
            used_percent: percent(used, used + free),
            inodes_total: usage.files,
            inodes_used,
            inodes_free: usage.files_free,
            inodes_used_percent: percent(inodes_used, usage.files),
        })
    }

    fn load_avg(&self) -> Result<LoadAvg, CollectError> {
        let content = self.read_proc("loadavg")?;
        let info = parse_loadavg(&content)?;

        Ok(LoadAvg {
            load1: info.load1,
            load5: info.load5,
            load15: info.load15,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use std::io;

    fn stats(fs: MockFs) -> ProcfsStats<MockFs> {
        ProcfsStats::new(fs, "/proc").with_clock_ticks(100)
    }

    #[test]
    fn test_cpu_times_per_cpu() {
        let cpus = stats(MockFs::typical_system()).cpu_times().unwrap().per_cpu;

        assert_eq!(cpus.len(), 4);
        assert_eq!(cpus[0].cpu, "cpu0");
        assert_eq!(cpus[3].cpu, "cpu3");
        assert!((cpus[0].user - 25.0).abs() < 1e-9);
        assert!((cpus[0].idle - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_cpu_times_total() {
        let total = stats(MockFs::typical_system()).cpu_times().unwrap().total;

        assert_eq!(total.cpu, "cpu-total");
        assert!((total.user - 100.0).abs() < 1e-9);
        assert!((total.system - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_cpu_times_uses_clock_ticks() {
        let reading = ProcfsStats::new(MockFs::typical_system(), "/proc")
            .with_clock_ticks(250)
            .cpu_times()
            .unwrap();
        assert!((reading.per_cpu[0].user - 10.0).abs() < 1e-9);
        assert!((reading.total.user - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_cpu_times_without_clock_ticks() {
        let err = ProcfsStats::new(MockFs::typical_system(), "/proc")
            .with_clock_ticks(0)
            .cpu_times()
            .unwrap_err();
        assert!(matches!(err, CollectError::Unavailable(_)));
    }

    #[test]
    fn test_cpu_times_requires_total_line() {
        let mut fs = MockFs::typical_system();
        fs.add_file("/proc/stat", "cpu0 1 2 3 4\ncpu1 1 2 3 4\n");
        let err = stats(fs).cpu_times().unwrap_err();
        assert!(matches!(err, CollectError::Parse(_)));
    }

    #[test]
    fn test_host_clock_ticks() {
        #[cfg(unix)]
        assert!(host_clock_ticks().is_some_and(|t| t > 0));
    }

    #[test]
    fn test_virtual_memory() {
        let vm = stats(MockFs::typical_system()).virtual_memory().unwrap();

        assert_eq!(vm.total, 16_384_000 * 1024);
        assert_eq!(vm.free, 8_192_000 * 1024);
        assert_eq!(vm.available, 12_000_000 * 1024);
        // total - free - buffers - cached
        assert_eq!(vm.used, 5_632_000 * 1024);
        assert!((vm.used_percent - 26.7578125).abs() < 1e-9);
        assert_eq!(vm.active, 4_096_000 * 1024);
    }

    #[test]
    fn test_virtual_memory_invalid_counter() {
        let mut fs = MockFs::typical_system();
        fs.add_file("/proc/meminfo", "MemTotal:       16384000 kB\nMemFree: garbage kB\n");
        let err = stats(fs).virtual_memory().unwrap_err();
        assert!(matches!(err, CollectError::Parse(msg) if msg.contains("MemFree")));
    }

    #[test]
    fn test_virtual_memory_estimates_available_on_old_kernels() {
        let mut fs = MockFs::new();
        fs.add_file(
            "/proc/meminfo",
            "MemTotal: 1000 kB\nMemFree: 400 kB\nBuffers: 100 kB\nCached: 200 kB\n\
             Active: 300 kB\nInactive: 100 kB\n",
        );
        let vm = stats(fs).virtual_memory().unwrap();
        assert_eq!(vm.available, 700 * 1024);
        assert!((vm.used_percent - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_net_io_counters_per_nic() {
        let nics = stats(MockFs::typical_system())
            .net_io_counters()
            .unwrap()
            .per_nic;

        assert_eq!(nics.len(), 2);
        assert_eq!(nics[0].name, "lo");
        assert_eq!(nics[1].name, "eth0");
        assert_eq!(nics[1].bytes_sent, 123456789);
        assert_eq!(nics[1].bytes_recv, 987654321);
        assert_eq!(nics[1].errin, 5);
        assert_eq!(nics[1].dropout, 5);
    }

    #[test]
    fn test_net_io_counters_all() {
        let all = stats(MockFs::typical_system())
            .net_io_counters()
            .unwrap()
            .total;

        assert_eq!(all.name, "all");
        assert_eq!(all.bytes_sent, 12345678 + 123456789);
        assert_eq!(all.packets_recv, 9876 + 654321);
    }

    #[test]
    fn test_net_io_counters_invalid_counter() {
        let mut fs = MockFs::typical_system();
        fs.add_file(
            "/proc/net/dev",
            "  eth0: xx 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15\n",
        );
        let err = stats(fs).net_io_counters().unwrap_err();
        assert!(matches!(err, CollectError::Parse(msg) if msg.contains("eth0")));
    }

    #[test]
    fn test_conntrack() {
        let ct = stats(MockFs::with_conntrack()).conntrack().unwrap();
        assert_eq!(ct.count, 1024);
        assert_eq!(ct.max, 262144);
    }

    #[test]
    fn test_conntrack_missing_module() {
        let err = stats(MockFs::typical_system()).conntrack().unwrap_err();
        match err {
            CollectError::Io { path, source } => {
                assert!(path.ends_with("nf_conntrack_count"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_interface_info() {
        let s = stats(MockFs::typical_system());

        let eth0 = s.interface_info("eth0");
        assert_eq!(eth0.hardware_addr.as_deref(), Some("52:54:00:12:34:56"));
        assert_eq!(eth0.mtu, Some(1500));

        let missing = s.interface_info("wlan9");
        assert_eq!(missing, InterfaceInfo::default());
    }

    #[test]
    fn test_partitions_physical_and_all() {
        let s = stats(MockFs::typical_system());

        let physical: Vec<String> = s
            .partitions(false)
            .unwrap()
            .into_iter()
            .map(|p| p.mountpoint)
            .collect();
        assert_eq!(physical, vec!["/", "/var", "/boot"]);

        let all = s.partitions(true).unwrap();
        assert_eq!(all.len(), 6);
        assert_eq!(all[1].mountpoint, "/proc");
        assert_eq!(all[1].fstype, "proc");
    }

    #[test]
    fn test_disk_usage() {
        let usage = stats(MockFs::typical_system()).disk_usage("/").unwrap();

        assert_eq!(usage.total, 25_000_000 * 4096);
        assert_eq!(usage.free, 9_000_000 * 4096);
        assert_eq!(usage.used, 15_000_000 * 4096);
        assert!((usage.used_percent - 62.5).abs() < 1e-9);
        assert_eq!(usage.inodes_total, 6_400_000);
        assert_eq!(usage.inodes_used, 1_400_000);
        assert!((usage.inodes_used_percent - 21.875).abs() < 1e-9);
    }

    #[test]
    fn test_disk_usage_empty_filesystem() {
        let usage = stats(MockFs::typical_system())
            .disk_usage("/proc")
            .unwrap();
        assert_eq!(usage.total, 0);
        assert_eq!(usage.used_percent, 0.0);
        assert_eq!(usage.inodes_used_percent, 0.0);
    }

    #[test]
    fn test_disk_usage_unknown_mount() {
        let err = stats(MockFs::typical_system())
            .disk_usage("/nowhere")
            .unwrap_err();
        assert!(err.to_string().contains("/nowhere"));
    }

    #[test]
    fn test_load_avg() {
        let load = stats(MockFs::typical_system()).load_avg().unwrap();
        assert!((load.load1 - 0.15).abs() < 1e-9);
        assert!((load.load5 - 0.10).abs() < 1e-9);
        assert!((load.load15 - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_custom_proc_path() {
        let mut fs = MockFs::new();
        fs.add_file("/host/proc/loadavg", "4.50 3.00 2.00 8/300 999\n");

        let load = ProcfsStats::new(fs, "/host/proc").load_avg().unwrap();
        assert!((load.load1 - 4.5).abs() < 1e-9);
    }
}
