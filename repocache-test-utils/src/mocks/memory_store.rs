//! In-memory file store for testing

use repocache_core::error::IoError;
use repocache_core::file_store::{normalize_lines, now_millis};
use repocache_core::{FileStore, Result};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct MemoryFile {
    content: String,
    modified_millis: u64,
}

/// [`FileStore`] that keeps files in a map
///
/// Writes, reads and mtime lookups can be made to fail on demand so tests can
/// observe how the engine degrades.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    files: Mutex<BTreeMap<PathBuf, MemoryFile>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    fail_mtime: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryFileStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<PathBuf, MemoryFile>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn denied(path: &Path, action: &str) -> IoError {
        IoError::permission_denied(
            path,
            io::Error::new(io::ErrorKind::PermissionDenied, format!("injected {action} failure")),
        )
    }

    /// Add a file with an explicit modification time
    pub fn add_file(&self, path: impl Into<PathBuf>, content: &str, modified_millis: u64) {
        self.files().insert(
            path.into(),
            MemoryFile {
                content: content.to_string(),
                modified_millis,
            },
        );
    }

    /// Stored content of `path`, without line normalisation
    pub fn raw_content(&self, path: &Path) -> Option<String> {
        self.files().get(path).map(|file| file.content.clone())
    }

    /// Every stored path, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files().is_empty()
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mtime(&self, fail: bool) {
        self.fail_mtime.store(fail, Ordering::SeqCst);
    }

    /// Remove every file
    pub fn reset(&self) {
        self.files().clear();
    }
}

impl FileStore for MemoryFileStore {
    fn write(&self, path: &Path, content: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::denied(path, "write").into());
        }
        self.add_file(path, content, now_millis());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<String> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::denied(path, "read").into());
        }
        Ok(self
            .files()
            .get(path)
            .map(|file| normalize_lines(&file.content))
            .unwrap_or_default())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files().contains_key(path)
    }

    fn mtime(&self, path: &Path) -> Result<u64> {
        if self.fail_mtime.load(Ordering::SeqCst) {
            return Err(Self::denied(path, "mtime").into());
        }
        self.files()
            .get(path)
            .map(|file| file.modified_millis)
            .ok_or_else(|| IoError::file_not_found(path).into())
    }

    fn set_mtime(&self, path: &Path, millis: u64) -> Result<()> {
        match self.files().get_mut(path) {
            Some(file) => {
                file.modified_millis = millis;
                Ok(())
            }
            None => Err(IoError::file_not_found(path).into()),
        }
    }

    fn remove(&self, path: &Path) -> Result<()> {
        self.files().remove(path);
        Ok(())
    }

    fn clear(&self, path: &Path) -> Result<()> {
        let mut files = self.files();
        if files.remove(path).is_none() {
            files.retain(|file, _| file.parent() != Some(path));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_empty() {
        let store = MemoryFileStore::new();
        assert_eq!(store.read(Path::new("/cache/rpc_content_x")).unwrap(), "");
        assert!(store.mtime(Path::new("/cache/rpc_x")).is_err());
    }

    #[test]
    fn test_write_read_normalises_lines() {
        let store = MemoryFileStore::new();
        let path = Path::new("/cache/rpc_content_x");

        store.write(path, "a\r\nb\n").unwrap();

        assert_eq!(store.read(path).unwrap(), "a\nb");
        assert_eq!(store.raw_content(path).as_deref(), Some("a\r\nb\n"));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_set_mtime() {
        let store = MemoryFileStore::new();
        let path = Path::new("/cache/rpc_x");
        store.write(path, "").unwrap();

        store.set_mtime(path, 42).unwrap();

        assert_eq!(store.mtime(path).unwrap(), 42);
        assert!(store.set_mtime(Path::new("/cache/missing"), 1).is_err());
    }

    #[test]
    fn test_clear_is_not_recursive() {
        let store = MemoryFileStore::new();
        store.add_file("/cache/rpc_a", "", 1);
        store.add_file("/cache/rpc_content_a", "x", 1);
        store.add_file("/cache/nested/rpc_b", "", 1);
        store.add_file("/other/rpc_c", "", 1);

        store.clear(Path::new("/cache")).unwrap();

        assert_eq!(
            store.paths(),
            vec![PathBuf::from("/cache/nested/rpc_b"), PathBuf::from("/other/rpc_c")]
        );
    }

    #[test]
    fn test_clear_single_file() {
        let store = MemoryFileStore::new();
        store.add_file("/cache/rpc_a", "", 1);
        store.add_file("/cache/rpc_b", "", 1);

        store.clear(Path::new("/cache/rpc_a")).unwrap();

        assert_eq!(store.paths(), vec![PathBuf::from("/cache/rpc_b")]);
    }

    #[test]
    fn test_injected_failures() {
        let store = MemoryFileStore::new();
        let path = Path::new("/cache/rpc_x");
        store.add_file(path, "", 1);

        store.fail_writes(true);
        store.fail_reads(true);
        store.fail_mtime(true);

        assert!(store.write(path, "y").unwrap_err().is_io());
        assert!(store.read(path).is_err());
        assert!(store.mtime(path).is_err());
        assert!(!store.contains(path, ""));

        store.fail_reads(false);
        assert!(store.contains(path, ""));
    }

    #[test]
    fn test_reset() {
        let store = MemoryFileStore::new();
        store.add_file("/cache/rpc_a", "", 1);
        assert!(!store.is_empty());

        store.reset();

        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }
}
