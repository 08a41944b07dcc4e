//! The cache engine
//!
//! [`CacheEngine`] answers the three questions asked about a cached call
//! (is it cached, is it expired, what is stored) synchronously, and pushes
//! every mutation (persist, evict, evict-all) to its [`TaskExecutor`].
//!
//! Per slot the engine moves between three states:
//!
//! ```text
//! ABSENT --persist--> CACHED_FRESH --ttl elapses--> CACHED_EXPIRED
//!    ^                                                   |
//!    +------- evict (explicit or seen by is_expired) ----+
//! ```
//!
//! The marker file decides "cached" and carries the freshness timestamp in
//! its mtime. The content file only carries the payload.

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{Error, Result, ValidationError};
use crate::file_store::{FileStore, LocalFileStore};
use crate::handle::CacheHandle;
use crate::worker::{InlineExecutor, TaskExecutor, WorkerPool};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the engine's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Persist tasks handed to the executor
    pub persists_scheduled: u64,
    /// Evict and evict-all tasks handed to the executor
    pub evictions_scheduled: u64,
    /// Expired entries observed by `is_expired`
    pub expirations_observed: u64,
    /// Filesystem failures that were logged instead of returned
    pub io_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    persists_scheduled: AtomicU64,
    evictions_scheduled: AtomicU64,
    expirations_observed: AtomicU64,
    io_failures: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> EngineStats {
        EngineStats {
            persists_scheduled: self.persists_scheduled.load(Ordering::Relaxed),
            evictions_scheduled: self.evictions_scheduled.load(Ordering::Relaxed),
            expirations_observed: self.expirations_observed.load(Ordering::Relaxed),
            io_failures: self.io_failures.load(Ordering::Relaxed),
        }
    }

    fn io_failure(&self, action: &str, error: &Error) {
        self.io_failures.fetch_add(1, Ordering::Relaxed);
        log::warn!("Cache {action} failed: {error}");
    }
}

struct EngineInner {
    config: EngineConfig,
    store: Arc<dyn FileStore>,
    executor: Arc<dyn TaskExecutor>,
    clock: Arc<dyn Clock>,
    counters: Arc<Counters>,
}

/// Method-result cache engine
///
/// Cheap to clone; clones share the store, the executor and the counters.
#[derive(Clone)]
pub struct CacheEngine {
    inner: Arc<EngineInner>,
}

static GLOBAL: OnceCell<CacheEngine> = OnceCell::new();

impl CacheEngine {
    /// Engine over the local filesystem with a [`WorkerPool`] sized from `config`
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::builder().with_config(config).build()
    }

    pub fn builder() -> CacheEngineBuilder {
        CacheEngineBuilder::default()
    }

    /// The process-wide engine, built on first access
    ///
    /// Configuration comes from [`EngineConfig::load`]. If loading fails the
    /// defaults are used; if no worker thread can be spawned the engine falls
    /// back to running tasks inline.
    pub fn global() -> &'static CacheEngine {
        GLOBAL.get_or_init(|| {
            let config = EngineConfig::load().unwrap_or_else(|e| {
                log::warn!("Failed to load cache configuration, using defaults: {e}");
                EngineConfig::default()
            });

            match Self::new(config.clone()) {
                Ok(engine) => engine,
                Err(e) => {
                    log::error!("Failed to start cache workers, running tasks inline: {e}");
                    Self::assemble(
                        config,
                        Arc::new(LocalFileStore::new()),
                        Arc::new(InlineExecutor),
                        Arc::new(SystemClock),
                    )
                }
            }
        })
    }

    /// Install `engine` as the process-wide engine
    ///
    /// Fails if [`global`](Self::global) was already initialised.
    pub fn install_global(engine: CacheEngine) -> Result<()> {
        GLOBAL.set(engine).map_err(|_| {
            Error::from(ValidationError::invalid_configuration(
                "the global cache engine is already initialised",
            ))
        })
    }

    fn assemble(
        config: EngineConfig,
        store: Arc<dyn FileStore>,
        executor: Arc<dyn TaskExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                config,
                store,
                executor,
                clock,
                counters: Arc::new(Counters::default()),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// A handle in the configured default cache directory
    pub fn handle(&self, base_name: impl Into<String>, ttl_ms: u64) -> Result<CacheHandle> {
        CacheHandle::new(self.inner.config.cache_dir.clone(), base_name, ttl_ms)
    }

    /// Schedule creation of the marker, refreshing its mtime to now
    pub fn persist(&self, handle: &CacheHandle) -> Result<()> {
        self.schedule_persist(handle, None)
    }

    /// Schedule storage of `content` and creation of the marker
    pub fn persist_content(&self, handle: &CacheHandle, content: impl Into<String>) -> Result<()> {
        self.schedule_persist(handle, Some(content.into()))
    }

    fn schedule_persist(&self, handle: &CacheHandle, content: Option<String>) -> Result<()> {
        let marker = handle.marker_path();
        let payload = content.map(|content| (handle.content_path(), content));
        let scheduled_at = self.inner.clock.now_millis();
        let store = Arc::clone(&self.inner.store);
        let counters = Arc::clone(&self.inner.counters);

        log::debug!("Scheduling persist of {}", marker.display());
        self.inner.executor.submit(
            handle.base_name(),
            Box::new(move || {
                // Payload first, so a visible marker never points at stale content.
                if let Some((path, content)) = payload {
                    write_if_changed(store.as_ref(), &counters, &path, &content);
                }
                if write_if_changed(store.as_ref(), &counters, &marker, "")
                    && let Err(e) = store.set_mtime(&marker, scheduled_at)
                {
                    counters.io_failure("mtime refresh", &e);
                }
            }),
        )?;

        self.inner
            .counters
            .persists_scheduled
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Schedule deletion of the marker and content files of the selected slot
    pub fn evict(&self, handle: &CacheHandle) -> Result<()> {
        let marker = handle.marker_path();
        let content = handle.content_path();
        let store = Arc::clone(&self.inner.store);
        let counters = Arc::clone(&self.inner.counters);

        log::debug!("Scheduling eviction of {}", marker.display());
        self.inner.executor.submit(
            handle.base_name(),
            Box::new(move || {
                for path in [&marker, &content] {
                    if let Err(e) = store.remove(path) {
                        counters.io_failure("eviction", &e);
                    }
                }
            }),
        )?;

        self.inner
            .counters
            .evictions_scheduled
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Schedule deletion of every file directly inside `directory`
    pub fn evict_all(&self, directory: impl AsRef<Path>) -> Result<()> {
        let directory = directory.as_ref().to_path_buf();
        let key = directory.to_string_lossy().into_owned();
        let store = Arc::clone(&self.inner.store);
        let counters = Arc::clone(&self.inner.counters);

        log::debug!("Scheduling eviction of everything in {}", directory.display());
        self.inner.executor.submit(
            &key,
            Box::new(move || {
                if let Err(e) = store.clear(&directory) {
                    counters.io_failure("directory eviction", &e);
                }
            }),
        )?;

        self.inner
            .counters
            .evictions_scheduled
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Whether the marker of the selected slot exists
    pub fn is_cached(&self, handle: &CacheHandle) -> bool {
        self.inner.store.exists(&handle.marker_path())
    }

    /// Whether the selected slot needs refreshing
    ///
    /// True when not cached, or when the ttl has elapsed since the last
    /// persist. An expired entry is evicted in the background.
    pub fn is_expired(&self, handle: &CacheHandle) -> bool {
        let marker = handle.marker_path();
        if !self.inner.store.exists(&marker) {
            log::trace!("Cache miss for {}", marker.display());
            return true;
        }
        if handle.is_unlimited() {
            return false;
        }

        let modified = match self.inner.store.mtime(&marker) {
            Ok(modified) => modified,
            Err(e) => {
                self.inner.counters.io_failure("freshness check", &e);
                return true;
            }
        };

        let now = self.inner.clock.now_millis();
        if now <= modified.saturating_add(handle.ttl_ms()) {
            return false;
        }

        log::debug!(
            "Cache entry {} expired {} ms ago",
            marker.display(),
            now - modified.saturating_add(handle.ttl_ms())
        );
        self.inner
            .counters
            .expirations_observed
            .fetch_add(1, Ordering::Relaxed);
        if let Err(e) = self.evict(handle) {
            log::warn!("Failed to schedule eviction of expired entry: {e}");
        }
        true
    }

    /// Stored payload of the selected slot; empty when there is none
    pub fn get_content(&self, handle: &CacheHandle) -> String {
        match self.inner.store.read(&handle.content_path()) {
            Ok(content) => content,
            Err(e) => {
                self.inner.counters.io_failure("content read", &e);
                String::new()
            }
        }
    }

    pub fn marker_path(&self, handle: &CacheHandle) -> PathBuf {
        handle.marker_path()
    }

    pub fn content_path(&self, handle: &CacheHandle) -> PathBuf {
        handle.content_path()
    }

    /// Block until every task scheduled so far has run
    ///
    /// Must not be called from inside an async runtime; use
    /// [`flush_async`](Self::flush_async) there.
    pub fn flush(&self) {
        self.inner.executor.barrier().wait();
    }

    /// Wait until every task scheduled so far has run
    pub async fn flush_async(&self) {
        self.inner.executor.barrier().wait_async().await;
    }

    /// Current time on the engine's clock, in milliseconds since the Unix epoch
    pub fn now_millis(&self) -> u64 {
        self.inner.clock.now_millis()
    }

    pub fn stats(&self) -> EngineStats {
        self.inner.counters.snapshot()
    }
}

/// Write `content` unless the file already holds it; false if the write failed
fn write_if_changed(
    store: &dyn FileStore,
    counters: &Counters,
    path: &Path,
    content: &str,
) -> bool {
    if store.contains(path, content) {
        return true;
    }
    match store.write(path, content) {
        Ok(()) => true,
        Err(e) => {
            counters.io_failure("write", &e);
            false
        }
    }
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Evict every file in `directory` using the process-wide engine
pub fn evict_all(directory: impl AsRef<Path>) -> Result<()> {
    CacheEngine::global().evict_all(directory)
}

/// Builder for [`CacheEngine`]
#[derive(Default)]
pub struct CacheEngineBuilder {
    config: Option<EngineConfig>,
    store: Option<Arc<dyn FileStore>>,
    executor: Option<Arc<dyn TaskExecutor>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CacheEngineBuilder {
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use `store` instead of the local filesystem
    pub fn with_store(self, store: impl FileStore + 'static) -> Self {
        self.with_shared_store(Arc::new(store))
    }

    pub fn with_shared_store(mut self, store: Arc<dyn FileStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use `executor` instead of a [`WorkerPool`]
    pub fn with_executor(mut self, executor: impl TaskExecutor + 'static) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Run every task on the caller's thread
    pub fn inline(self) -> Self {
        self.with_executor(InlineExecutor)
    }

    /// Read time from `clock` instead of the system clock
    pub fn with_clock(self, clock: impl Clock + 'static) -> Self {
        self.with_shared_clock(Arc::new(clock))
    }

    pub fn with_shared_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<CacheEngine> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let store = self.store.unwrap_or_else(|| Arc::new(LocalFileStore::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let executor = match self.executor {
            Some(executor) => executor,
            None => Arc::new(WorkerPool::new(config.worker_threads)?),
        };

        Ok(CacheEngine::assemble(config, store, executor, clock))
    }
}
