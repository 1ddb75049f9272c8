//! Abstractions for filesystem access to enable testing and mocking.
//!
//! The `FileSystem` trait allows the statistics source to work with both the
//! real `/proc` and `/sys` trees on Linux and mock implementations for testing
//! on macOS or in CI.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// Raw filesystem usage counters, mirroring `struct statvfs`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsUsage {
    /// Fragment size (`f_frsize`), the unit of the block counters.
    pub block_size: u64,
    /// Total blocks (`f_blocks`).
    pub blocks: u64,
    /// Free blocks (`f_bfree`).
    pub blocks_free: u64,
    /// Free blocks available to unprivileged users (`f_bavail`).
    pub blocks_available: u64,
    /// Total inodes (`f_files`).
    pub files: u64,
    /// Free inodes (`f_ffree`).
    pub files_free: u64,
}

/// Abstraction for filesystem operations.
///
/// This trait allows collectors to read from the real filesystem or from
/// a mock implementation for testing purposes.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Returns usage counters of the filesystem mounted at `path`.
    fn statvfs(&self, path: &Path) -> io::Result<FsUsage>;
}

/// Real filesystem implementation that delegates to `std::fs` and `statvfs(3)`.
///
/// Use this in production to read from the actual `/proc` filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    #[cfg(unix)]
    #[allow(clippy::unnecessary_cast)]
    fn statvfs(&self, path: &Path) -> io::Result<FsUsage> {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        // SAFETY: `c_path` is a valid NUL-terminated string and `stat` is a
        // properly sized, writable `statvfs` struct.
        let ret = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }

        // Field widths differ between platforms (u32 on macOS, u64 on Linux).
        Ok(FsUsage {
            block_size: stat.f_frsize as u64,
            blocks: stat.f_blocks as u64,
            blocks_free: stat.f_bfree as u64,
            blocks_available: stat.f_bavail as u64,
            files: stat.f_files as u64,
            files_free: stat.f_ffree as u64,
        })
    }

    #[cfg(not(unix))]
    fn statvfs(&self, path: &Path) -> io::Result<FsUsage> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("statvfs is not available for {:?}", path),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_real_fs_read_to_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loadavg");
        fs::write(&path, "0.15 0.10 0.05 1/150 1234\n").unwrap();

        let content = RealFs::new().read_to_string(&path).unwrap();
        assert_eq!(content, "0.15 0.10 0.05 1/150 1234\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_real_fs_statvfs() {
        let dir = tempfile::tempdir().unwrap();
        let usage = RealFs::new().statvfs(dir.path()).unwrap();

        assert!(usage.block_size > 0);
        assert!(usage.blocks >= usage.blocks_free);
    }

    #[cfg(unix)]
    #[test]
    fn test_real_fs_statvfs_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = RealFs::new()
            .statvfs(&dir.path().join("missing"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
