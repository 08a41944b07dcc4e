//! Cache handles
//!
//! A [`CacheHandle`] describes one cacheable call site: where its files live,
//! the hashed method identity, and how long an entry stays fresh. The runtime
//! selection key partitions a single call site into independent slots, for
//! example one slot per record id.

use crate::error::{Result, ValidationError};
use crate::naming;
use std::path::{Path, PathBuf};

/// One cacheable call site plus an optional selection key
///
/// Everything except the selection key is fixed at construction. The
/// effective name is recomputed on every access, so a call to
/// [`select`](Self::select) takes effect immediately.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheHandle {
    cache_dir: PathBuf,
    base_name: String,
    ttl_ms: u64,
    selection_key: Option<String>,
}

impl CacheHandle {
    /// Create a handle
    ///
    /// `base_name` is normally `md5_hex(identity)`; see
    /// [`MethodSignature::base_name`](crate::MethodSignature::base_name).
    /// A `ttl_ms` of 0 means the entry never expires while present.
    pub fn new(
        cache_dir: impl Into<PathBuf>,
        base_name: impl Into<String>,
        ttl_ms: u64,
    ) -> Result<Self> {
        let cache_dir = cache_dir.into();
        let base_name = base_name.into();

        if cache_dir.as_os_str().is_empty() {
            return Err(ValidationError::missing_field("cache_dir").into());
        }
        if base_name.trim().is_empty() {
            return Err(ValidationError::invalid_parameter("base_name", "must not be empty").into());
        }

        Ok(Self {
            cache_dir,
            base_name,
            ttl_ms,
            selection_key: None,
        })
    }

    /// Select the slot for `key`
    pub fn select<K: ToString>(&mut self, key: K) -> &mut Self {
        self.selection_key = Some(key.to_string());
        self
    }

    /// Select the slot for an optional key; `None` selects the default slot
    pub fn select_opt<K: ToString>(&mut self, key: Option<K>) -> &mut Self {
        self.selection_key = key.map(|k| k.to_string());
        self
    }

    /// Go back to the default slot
    pub fn deselect(&mut self) -> &mut Self {
        self.selection_key = None;
        self
    }

    /// Builder form of [`select`](Self::select)
    pub fn with_key<K: ToString>(mut self, key: K) -> Self {
        self.select(key);
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    pub fn selection_key(&self) -> Option<&str> {
        self.selection_key.as_deref()
    }

    /// Whether entries of this handle never expire
    pub fn is_unlimited(&self) -> bool {
        self.ttl_ms == 0
    }

    /// The 32-character effective name of the selected slot
    pub fn file_name(&self) -> String {
        naming::effective_name(&self.base_name, self.selection_key.as_deref())
    }

    /// Path of the marker file of the selected slot
    pub fn marker_path(&self) -> PathBuf {
        self.cache_dir.join(naming::marker_file_name(&self.file_name()))
    }

    /// Path of the content file of the selected slot
    pub fn content_path(&self) -> PathBuf {
        self.cache_dir.join(naming::content_file_name(&self.file_name()))
    }
}
