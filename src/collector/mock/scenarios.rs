//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` and `/sys` states
//! for testing various host configurations.

use super::filesystem::MockFs;
use crate::collector::traits::FsUsage;

const NET_DEV_HEADER: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
";

impl MockFs {
    /// Creates a typical 4-core host with a loopback and one ethernet
    /// interface, three physical mounts and three pseudo filesystems.
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        fs.add_file("/proc/loadavg", "0.15 0.10 0.05 1/150 1234\n");
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
Active:          4096000 kB
Inactive:        2048000 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
Dirty:              1024 kB
Writeback:             0 kB
Slab:             512000 kB
SReclaimable:     256000 kB
",
        );
        fs.add_file(
            "/proc/stat",
            "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2400 125 750 20000 250 50 25 0 0 0
cpu2 2600 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
intr 1000000 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
",
        );

        fs.add_file(
            "/proc/net/dev",
            format!(
                "{NET_DEV_HEADER}\
    lo: 12345678     9876    0    0    0     0          0         0 12345678     9876    0    0    0     0       0          0
  eth0: 987654321   654321    5   10    0     0          0       100 123456789   456789    2    5    0     0       0          0
"
            ),
        );
        fs.add_interface("lo", "00:00:00:00:00:00", 65536);
        fs.add_interface("eth0", "52:54:00:12:34:56", 1500);

        fs.add_file(
            "/proc/filesystems",
            "\
nodev\tsysfs
nodev\ttmpfs
nodev\tproc
\text4
\tvfat
",
        );
        fs.add_file(
            "/proc/self/mounts",
            "\
/dev/sda1 / ext4 rw,relatime 0 0
proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0
/dev/sda2 /var ext4 rw,relatime 0 0
tmpfs /run tmpfs rw,nosuid,nodev,mode=755 0 0
sysfs /sys sysfs rw,nosuid,nodev,noexec,relatime 0 0
/dev/sda3 /boot vfat rw,relatime 0 0
",
        );
        fs.add_usage(
            "/",
            FsUsage {
                block_size: 4096,
                blocks: 25_000_000,
                blocks_free: 10_000_000,
                blocks_available: 9_000_000,
                files: 6_400_000,
                files_free: 5_000_000,
            },
        );
        fs.add_usage(
            "/var",
            FsUsage {
                block_size: 4096,
                blocks: 5_000_000,
                blocks_free: 4_000_000,
                blocks_available: 3_750_000,
                files: 1_280_000,
                files_free: 1_200_000,
            },
        );
        fs.add_usage(
            "/boot",
            FsUsage {
                block_size: 512,
                blocks: 1_048_576,
                blocks_free: 524_288,
                blocks_available: 524_288,
                files: 0,
                files_free: 0,
            },
        );
        fs.add_usage(
            "/run",
            FsUsage {
                block_size: 4096,
                blocks: 409_600,
                blocks_free: 409_000,
                blocks_available: 409_000,
                files: 2_048_000,
                files_free: 2_047_000,
            },
        );
        fs.add_usage("/proc", FsUsage::default());
        fs.add_usage("/sys", FsUsage::default());

        fs
    }

    /// Typical system with the netfilter conntrack module loaded.
    pub fn with_conntrack() -> Self {
        let mut fs = Self::typical_system();
        fs.add_file("/proc/sys/net/netfilter/nf_conntrack_count", "1024\n");
        fs.add_file("/proc/sys/net/netfilter/nf_conntrack_max", "262144\n");
        fs
    }

    /// Typical system where `eth0` is the only interface.
    pub fn single_interface() -> Self {
        let mut fs = Self::typical_system();
        fs.add_file(
            "/proc/net/dev",
            format!(
                "{NET_DEV_HEADER}\
  eth0: 987654321   654321    5   10    0     0          0       100 123456789   456789    2    5    0     0       0          0
"
            ),
        );
        fs
    }

    /// Typical system with an extra data disk mounted on a path with a space.
    pub fn with_spaced_mount() -> Self {
        let mut fs = Self::typical_system();
        fs.add_file(
            "/proc/self/mounts",
            "\
/dev/sda1 / ext4 rw,relatime 0 0
proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0
/dev/sdb1 /mnt/my\\040disk ext4 rw,relatime 0 0
",
        );
        fs.add_usage(
            "/mnt/my disk",
            FsUsage {
                block_size: 4096,
                blocks: 1_000,
                blocks_free: 500,
                blocks_available: 500,
                files: 100,
                files_free: 50,
            },
        );
        fs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::traits::FileSystem;
    use std::path::Path;

    #[test]
    fn test_typical_system_has_counter_files() {
        let fs = MockFs::typical_system();
        for path in [
            "/proc/stat",
            "/proc/meminfo",
            "/proc/loadavg",
            "/proc/net/dev",
            "/proc/self/mounts",
            "/proc/filesystems",
        ] {
            assert!(fs.read_to_string(Path::new(path)).is_ok(), "{} missing", path);
        }
        assert!(
            fs.read_to_string(Path::new("/proc/sys/net/netfilter/nf_conntrack_count"))
                .is_err()
        );
    }

    #[test]
    fn test_with_conntrack_adds_counters() {
        let fs = MockFs::with_conntrack();
        assert_eq!(
            fs.read_to_string(Path::new("/proc/sys/net/netfilter/nf_conntrack_max"))
                .unwrap(),
            "262144\n"
        );
    }

    #[test]
    fn test_every_mount_has_usage() {
        let fs = MockFs::typical_system();
        for mount in ["/", "/proc", "/var", "/run", "/sys", "/boot"] {
            assert!(fs.statvfs(Path::new(mount)).is_ok(), "{} has no usage", mount);
        }
    }
}
