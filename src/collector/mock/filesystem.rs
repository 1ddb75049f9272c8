//! In-memory mock filesystem for testing collectors without real `/proc`.
//!
//! This module provides `MockFs` which simulates a filesystem in memory,
//! allowing tests to run on macOS and in CI environments without Linux.

use crate::collector::traits::{FileSystem, FsUsage};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
///
/// Stores counter files and per-mount usage counters in memory, allowing
/// tests to simulate various host states without needing actual Linux access.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Map from mount point to `statvfs` counters.
    usages: HashMap<PathBuf, FsUsage>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content, replacing any previous one.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Removes a file, simulating a counter that disappeared.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        self.files.remove(path.as_ref());
    }

    /// Registers `statvfs` counters for a mount point.
    pub fn add_usage(&mut self, mountpoint: impl AsRef<Path>, usage: FsUsage) {
        self.usages.insert(mountpoint.as_ref().to_path_buf(), usage);
    }

    /// Adds an interface's `/sys/class/net/<name>/{address,mtu}` files.
    pub fn add_interface(&mut self, name: &str, address: &str, mtu: u32) {
        let base = PathBuf::from(format!("/sys/class/net/{}", name));
        self.add_file(base.join("address"), format!("{}\n", address));
        self.add_file(base.join("mtu"), format!("{}\n", mtu));
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn statvfs(&self, path: &Path) -> io::Result<FsUsage> {
        self.usages.get(path).copied().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no filesystem mounted at {:?}", path),
            )
        })
    }
}
