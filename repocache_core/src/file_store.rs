//! Filesystem access for cache files
//!
//! Every read, write, stat and delete the engine performs goes through a
//! [`FileStore`]. The trait is the seam for hosts that want to instrument or
//! replace disk access; [`LocalFileStore`] is the implementation backed by the
//! local filesystem.

use crate::error::{IoError, Result};
use filetime::FileTime;
use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Filesystem primitive used by the cache engine
///
/// Implementations must be stateless from the engine's point of view: the
/// same store is shared by the caller thread and every background worker.
pub trait FileStore: Send + Sync {
    /// Overwrite `path` with the UTF-8 bytes of `content`, creating it if absent
    fn write(&self, path: &Path, content: &str) -> Result<()>;

    /// Read the whole file, with lines joined by `\n`
    ///
    /// A missing file reads as the empty string.
    fn read(&self, path: &Path) -> Result<String>;

    /// Whether `path` exists
    fn exists(&self, path: &Path) -> bool;

    /// Modification time in milliseconds since the Unix epoch
    fn mtime(&self, path: &Path) -> Result<u64>;

    /// Set the modification time, in milliseconds since the Unix epoch
    fn set_mtime(&self, path: &Path, millis: u64) -> Result<()>;

    /// Delete a single file; a missing file is not an error
    fn remove(&self, path: &Path) -> Result<()>;

    /// Delete a file, or every direct child file of a directory
    ///
    /// Not recursive. A missing path is a no-op. Failures on individual
    /// children are logged and skipped.
    fn clear(&self, path: &Path) -> Result<()>;

    /// Whether `path` exists and reads back exactly as `text`
    fn contains(&self, path: &Path, text: &str) -> bool {
        self.exists(path) && self.read(path).is_ok_and(|content| content == text)
    }
}

/// [`FileStore`] backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileStore;

impl LocalFileStore {
    /// Create a new local file store
    pub fn new() -> Self {
        Self
    }
}

fn io_error(source: io::Error, path: &Path) -> IoError {
    IoError::from_std(source).with_path(path)
}

/// Join lines with `\n`, dropping `\r\n` terminators and the trailing newline
pub fn normalize_lines(raw: &str) -> String {
    raw.lines().collect::<Vec<_>>().join("\n")
}

/// Milliseconds since the Unix epoch; times before the epoch clamp to 0
pub fn system_time_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    system_time_millis(SystemTime::now())
}

impl FileStore for LocalFileStore {
    fn write(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| io_error(e, parent))?;
        }

        log::trace!("Writing {} bytes to {}", content.len(), path.display());
        fs::write(path, content.as_bytes()).map_err(|e| io_error(e, path))?;
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<String> {
        match fs::read_to_string(path) {
            Ok(raw) => Ok(normalize_lines(&raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(io_error(e, path).into()),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn mtime(&self, path: &Path) -> Result<u64> {
        let modified = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map_err(|e| io_error(e, path))?;
        Ok(system_time_millis(modified))
    }

    fn set_mtime(&self, path: &Path, millis: u64) -> Result<()> {
        let seconds = (millis / 1000) as i64;
        let nanos = ((millis % 1000) * 1_000_000) as u32;
        filetime::set_file_mtime(path, FileTime::from_unix_time(seconds, nanos))
            .map_err(|e| io_error(e, path))?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                log::trace!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e, path).into()),
        }
    }

    fn clear(&self, path: &Path) -> Result<()> {
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_error(e, path).into()),
        };

        if !metadata.is_dir() {
            return self.remove(path);
        }

        let entries = fs::read_dir(path).map_err(|e| io_error(e, path))?;
        let mut removed = 0usize;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry in {}: {e}", path.display());
                    continue;
                }
            };

            let child = entry.path();
            if child.is_dir() {
                continue;
            }

            match fs::remove_file(&child) {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("Failed to remove {}: {e}", child.display()),
            }
        }

        log::debug!("Cleared {removed} files from {}", path.display());
        Ok(())
    }
}
