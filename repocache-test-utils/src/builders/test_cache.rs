//! Temporary cache fixture

use repocache_core::{
    CacheEngine, CacheHandle, CacheRegistry, EngineConfig, FileStore, LocalFileStore,
    MethodSignature,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use crate::mocks::{ManualClock, MemoryFileStore};

/// A cache engine over a throwaway directory
///
/// The directory lives as long as the fixture.
pub struct TestCache {
    dir: TempDir,
    engine: CacheEngine,
    store: Arc<dyn FileStore>,
    memory: Option<Arc<MemoryFileStore>>,
    clock: Option<Arc<ManualClock>>,
}

/// Builder for [`TestCache`]
#[derive(Debug, Default)]
pub struct TestCacheBuilder {
    worker_threads: Option<usize>,
    in_memory: bool,
    clock_start: Option<u64>,
}

impl TestCacheBuilder {
    /// Run tasks on a worker pool of `threads` instead of inline
    pub fn with_workers(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    /// Keep files in a [`MemoryFileStore`] instead of on disk
    pub fn in_memory(mut self) -> Self {
        self.in_memory = true;
        self
    }

    /// Drive the engine from a [`ManualClock`] starting at `start_millis`
    pub fn with_manual_clock(mut self, start_millis: u64) -> Self {
        self.clock_start = Some(start_millis);
        self
    }

    pub fn build(self) -> TestCache {
        crate::init_logging();

        let dir = TempDir::new().expect("Failed to create temp dir");
        let memory = self.in_memory.then(|| Arc::new(MemoryFileStore::new()));
        let store: Arc<dyn FileStore> = match &memory {
            Some(memory) => memory.clone() as Arc<dyn FileStore>,
            None => Arc::new(LocalFileStore::new()) as Arc<dyn FileStore>,
        };

        let mut config = EngineConfig::default().with_cache_dir(dir.path());
        let clock = self.clock_start.map(|start| Arc::new(ManualClock::new(start)));

        let mut builder = CacheEngine::builder().with_shared_store(store.clone());
        if let Some(clock) = &clock {
            builder = builder.with_shared_clock(clock.clone());
        }
        builder = match self.worker_threads {
            Some(threads) => {
                config = config.with_worker_threads(threads);
                builder
            }
            None => builder.inline(),
        };
        let engine = builder
            .with_config(config)
            .build()
            .expect("Failed to build test engine");

        TestCache {
            dir,
            engine,
            store,
            memory,
            clock,
        }
    }
}

impl TestCache {
    /// Inline engine over a temporary directory on disk
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> TestCacheBuilder {
        TestCacheBuilder::default()
    }

    pub fn engine(&self) -> &CacheEngine {
        &self.engine
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// The in-memory store, when built with [`TestCacheBuilder::in_memory`]
    pub fn memory_store(&self) -> Option<&MemoryFileStore> {
        self.memory.as_deref()
    }

    /// The manual clock, when built with [`TestCacheBuilder::with_manual_clock`]
    pub fn clock(&self) -> Option<&ManualClock> {
        self.clock.as_deref()
    }

    /// Handle in the fixture directory
    pub fn handle(&self, base_name: &str, ttl_ms: u64) -> CacheHandle {
        CacheHandle::new(self.dir(), base_name, ttl_ms).expect("Invalid test handle")
    }

    /// Handle for a declared method in the fixture directory
    pub fn handle_for(&self, signature: &MethodSignature) -> CacheHandle {
        signature.handle(self.dir()).expect("Invalid test handle")
    }

    /// Registry for `owner` on the fixture engine
    pub fn registry(&self, owner: &str) -> CacheRegistry {
        CacheRegistry::new(self.engine.clone(), owner)
    }

    /// Move the marker's mtime to `age_ms` before the engine's current time
    pub fn backdate(&self, handle: &CacheHandle, age_ms: u64) {
        let modified = self.engine.now_millis().saturating_sub(age_ms);
        self.store
            .set_mtime(&handle.marker_path(), modified)
            .expect("Failed to backdate marker");
    }

    /// Names of the files directly inside the fixture directory, sorted
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match &self.memory {
            Some(memory) => memory
                .paths()
                .into_iter()
                .filter(|path| path.parent() == Some(self.dir()))
                .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect(),
            None => std::fs::read_dir(self.dir())
                .expect("Failed to list temp dir")
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().is_file())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect(),
        };
        names.sort();
        names
    }

    /// Wait for every scheduled task
    pub fn flush(&self) {
        self.engine.flush();
    }
}

impl Default for TestCache {
    fn default() -> Self {
        Self::new()
    }
}
