//! Handles bound to an engine

use crate::engine::CacheEngine;
use crate::error::Result;
use crate::handle::CacheHandle;
use std::path::Path;

/// A [`CacheHandle`] together with the engine that serves it
///
/// This is the value a host keeps at a call site: select a slot, ask whether
/// it is expired, fetch on a miss, then persist.
#[derive(Debug, Clone)]
pub struct CacheProxy {
    engine: CacheEngine,
    handle: CacheHandle,
}

impl CacheProxy {
    pub fn new(engine: CacheEngine, handle: CacheHandle) -> Self {
        Self { engine, handle }
    }

    /// Bind `handle` to the process-wide engine
    pub fn global(handle: CacheHandle) -> Self {
        Self::new(CacheEngine::global().clone(), handle)
    }

    pub fn select<K: ToString>(&mut self, key: K) -> &mut Self {
        self.handle.select(key);
        self
    }

    pub fn select_opt<K: ToString>(&mut self, key: Option<K>) -> &mut Self {
        self.handle.select_opt(key);
        self
    }

    pub fn deselect(&mut self) -> &mut Self {
        self.handle.deselect();
        self
    }

    pub fn persist(&self) -> Result<()> {
        self.engine.persist(&self.handle)
    }

    pub fn persist_content(&self, content: impl Into<String>) -> Result<()> {
        self.engine.persist_content(&self.handle, content)
    }

    pub fn evict(&self) -> Result<()> {
        self.engine.evict(&self.handle)
    }

    pub fn is_cached(&self) -> bool {
        self.engine.is_cached(&self.handle)
    }

    pub fn is_expired(&self) -> bool {
        self.engine.is_expired(&self.handle)
    }

    pub fn get_content(&self) -> String {
        self.engine.get_content(&self.handle)
    }

    pub fn cache_dir(&self) -> &Path {
        self.handle.cache_dir()
    }

    pub fn ttl_ms(&self) -> u64 {
        self.handle.ttl_ms()
    }

    /// Effective name of the selected slot
    pub fn file_name(&self) -> String {
        self.handle.file_name()
    }

    pub fn handle(&self) -> &CacheHandle {
        &self.handle
    }

    pub fn engine(&self) -> &CacheEngine {
        &self.engine
    }
}
