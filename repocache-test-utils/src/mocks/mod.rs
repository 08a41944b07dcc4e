//! Mock implementations for testing

mod manual_clock;
mod memory_store;

pub use manual_clock::ManualClock;
pub use memory_store::MemoryFileStore;
