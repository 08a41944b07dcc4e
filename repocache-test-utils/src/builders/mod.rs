//! Builders for test fixtures

mod test_cache;

pub use test_cache::{TestCache, TestCacheBuilder};
