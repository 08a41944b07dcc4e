//! Repocache Core Library
//!
//! A file-backed cache for the results of repository-style method calls.
//! Each cached method gets a stable identity; each call site selects a slot
//! by key, asks whether the slot is expired, fetches on a miss and persists
//! the result. Writes and evictions run on background workers.
//!
//! ```no_run
//! use repocache_core::{CacheEngine, CacheRegistry, Result};
//!
//! struct MyRepository;
//!
//! fn get_data_by_id(id: i32) -> Result<String> {
//!     let mut registry = CacheRegistry::for_type::<MyRepository>(CacheEngine::global().clone());
//!     registry.register(
//!         registry
//!             .declare("getDataById")
//!             .with_param("int")
//!             .with_ttl_ms(60_000),
//!     )?;
//!
//!     let mut cache = registry.proxy_in_default_dir("getDataById")?;
//!     cache.select(id);
//!     if !cache.is_expired() {
//!         return Ok(cache.get_content());
//!     }
//!
//!     let fresh = format!("record {id}");
//!     cache.persist_content(fresh.clone())?;
//!     Ok(fresh)
//! }
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod file_store;
pub mod handle;
pub mod naming;
pub mod proxy;
pub mod registry;
pub mod worker;

// Re-export main types
pub use clock::{Clock, SystemClock};
pub use config::EngineConfig;
pub use engine::{CacheEngine, CacheEngineBuilder, EngineStats, evict_all};
pub use error::{Error, Result};
pub use file_store::{FileStore, LocalFileStore};
pub use handle::CacheHandle;
pub use naming::{effective_name, md5_hex, method_identity};
pub use proxy::CacheProxy;
pub use registry::{CacheRegistry, MethodSignature};
pub use worker::{Barrier, InlineExecutor, Task, TaskExecutor, WorkerPool};
