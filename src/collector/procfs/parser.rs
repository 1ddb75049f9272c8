//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of various `/proc` files
//! into structured data. They are designed to be easily testable with string inputs.

use std::collections::{HashMap, HashSet};

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parsed data from `/proc/meminfo`, values in kB.
#[derive(Debug, Clone, Default)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_free: u64,
    /// Absent before Linux 3.14.
    pub mem_available: Option<u64>,
    pub buffers: u64,
    pub cached: u64,
    pub active: u64,
    pub inactive: u64,
}

const MEMINFO_KEYS: &[&str] = &[
    "MemTotal",
    "MemFree",
    "MemAvailable",
    "Buffers",
    "Cached",
    "Active",
    "Inactive",
];

/// Parses `/proc/meminfo` content.
///
/// Every key except `MemAvailable` is required, and a value that is not a
/// number is an error.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut fields: HashMap<&str, u64> = HashMap::new();

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if !MEMINFO_KEYS.contains(&key) {
            continue;
        }
        let value = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| ParseError::new(format!("invalid {} value '{}'", key, rest.trim())))?;
        fields.insert(key, value);
    }

    let require = |key: &str| {
        fields
            .get(key)
            .copied()
            .ok_or_else(|| ParseError::new(format!("{} missing from meminfo", key)))
    };

    Ok(MemInfo {
        mem_total: require("MemTotal")?,
        mem_free: require("MemFree")?,
        mem_available: fields.get("MemAvailable").copied(),
        buffers: require("Buffers")?,
        cached: require("Cached")?,
        active: require("Active")?,
        inactive: require("Inactive")?,
    })
}

/// Parses every value in `raw` into `slots`, in order.
fn parse_counters(slots: &mut [u64], raw: &[&str], owner: &str) -> Result<(), ParseError> {
    for (slot, value) in slots.iter_mut().zip(raw) {
        *slot = value
            .parse()
            .map_err(|_| ParseError::new(format!("invalid counter '{}' for {}", value, owner)))?;
    }
    Ok(())
}

/// Single CPU line from `/proc/stat`, in jiffies.
#[derive(Debug, Clone, Default)]
pub struct CpuStat {
    pub cpu_id: Option<u32>, // None for aggregate "cpu" line
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

/// Parses the `cpu` lines of `/proc/stat`, keeping file order.
pub fn parse_cpu_stat(content: &str) -> Result<Vec<CpuStat>, ParseError> {
    let mut cpus = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(label) = parts.first() else {
            continue;
        };
        if !label.starts_with("cpu") {
            continue;
        }

        let cpu_id = if *label == "cpu" {
            None
        } else {
            let id = label
                .strip_prefix("cpu")
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| ParseError::new(format!("invalid cpu label '{}'", label)))?;
            Some(id)
        };

        // user nice system idle are present on every kernel we support
        if parts.len() < 5 {
            return Err(ParseError::new(format!("truncated line for {}", label)));
        }

        // Columns added by later kernels stay zero when absent
        let mut v = [0u64; 10];
        parse_counters(&mut v, &parts[1..], label)?;

        cpus.push(CpuStat {
            cpu_id,
            user: v[0],
            nice: v[1],
            system: v[2],
            idle: v[3],
            iowait: v[4],
            irq: v[5],
            softirq: v[6],
            steal: v[7],
            guest: v[8],
            guest_nice: v[9],
        });
    }

    if cpus.is_empty() {
        return Err(ParseError::new("no cpu lines in stat"));
    }

    Ok(cpus)
}

/// Parsed data from `/proc/loadavg`.
#[derive(Debug, Clone, Default)]
pub struct LoadAvg {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

/// Parses `/proc/loadavg` content.
pub fn parse_loadavg(content: &str) -> Result<LoadAvg, ParseError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(ParseError::new("invalid loadavg format"));
    }

    let load1 = parts[0]
        .parse()
        .map_err(|_| ParseError::new("invalid load1"))?;
    let load5 = parts[1]
        .parse()
        .map_err(|_| ParseError::new("invalid load5"))?;
    let load15 = parts[2]
        .parse()
        .map_err(|_| ParseError::new("invalid load15"))?;

    Ok(LoadAvg {
        load1,
        load5,
        load15,
    })
}

// ============ Network Device Stats Parser ============

/// Parsed data from `/proc/net/dev`.
#[derive(Debug, Clone, Default)]
pub struct NetDevStats {
    /// Interface name (eth0, lo, etc.)
    pub interface: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errs: u64,
    pub rx_drop: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errs: u64,
    pub tx_drop: u64,
}

/// Parses `/proc/net/dev` content.
///
/// Format:
/// Inter-|   Receive                                                |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
///    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
pub fn parse_net_dev(content: &str) -> Result<Vec<NetDevStats>, ParseError> {
    let mut devices = Vec::new();

    for line in content.lines() {
        // Skip header lines
        if line.contains('|') || line.trim().is_empty() {
            continue;
        }

        let Some((name, counters)) = line.split_once(':') else {
            continue;
        };

        let interface = name.trim().to_string();
        let values: Vec<&str> = counters.split_whitespace().collect();
        if values.len() < 16 {
            return Err(ParseError::new(format!(
                "expected 16 counters for {}, got {}",
                interface,
                values.len()
            )));
        }

        let mut v = [0u64; 16];
        parse_counters(&mut v, &values, &interface)?;

        devices.push(NetDevStats {
            interface,
            rx_bytes: v[0],
            rx_packets: v[1],
            rx_errs: v[2],
            rx_drop: v[3],
            tx_bytes: v[8],
            tx_packets: v[9],
            tx_errs: v[10],
            tx_drop: v[11],
        });
    }

    Ok(devices)
}

// ============ Mount table ============

/// One line of `/proc/self/mounts`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
}

/// Parses `/proc/self/mounts` (fstab format).
///
/// Format: `device mountpoint fstype options dump pass`. Whitespace inside
/// paths is octal-escaped by the kernel (`\040` for a space).
pub fn parse_mounts(content: &str) -> Result<Vec<MountEntry>, ParseError> {
    let mut entries = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [] => continue,
            [device, mountpoint, fstype, _opts, ..] => entries.push(MountEntry {
                device: unescape_octal(device),
                mountpoint: unescape_octal(mountpoint),
                fstype: fstype.to_string(),
            }),
            _ => return Err(ParseError::new(format!("truncated mount entry '{}'", line))),
        }
    }

    Ok(entries)
}

/// Decodes `\NNN` octal escapes used in mount tables.
fn unescape_octal(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\'
            && let Some(digits) = bytes.get(i + 1..i + 4)
            && digits.iter().all(|d| (b'0'..=b'7').contains(d))
        {
            let code = digits.iter().fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
            if let Ok(code) = u8::try_from(code) {
                out.push(code);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Parses `/proc/filesystems`, returning the types that need a block device.
///
/// Lines flagged `nodev` (proc, sysfs, tmpfs, ...) are left out.
pub fn parse_physical_fstypes(content: &str) -> HashSet<String> {
    content
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.as_slice() {
                [fstype] => Some(fstype.to_string()),
                _ => None,
            }
        })
        .collect()
}

/// Parses a file holding a single unsigned integer, such as
/// `/proc/sys/net/netfilter/nf_conntrack_count`.
pub fn parse_counter(content: &str) -> Result<u64, ParseError> {
    let value = content.trim();
    value
        .parse()
        .map_err(|_| ParseError::new(format!("invalid counter value '{}'", value)))
}
