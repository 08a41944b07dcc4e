//! Test utilities for the repocache engine
//!
//! This crate provides an in-memory file store, a temporary cache fixture
//! and logging setup for testing the engine.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::{TestCache, TestCacheBuilder};
pub use mocks::{ManualClock, MemoryFileStore};

/// Route `log` output through the test harness's captured stdout
///
/// Safe to call from every test; only the first call installs the logger.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
