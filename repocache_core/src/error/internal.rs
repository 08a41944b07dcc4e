//! Internal library error types

use thiserror::Error;

/// Internal library errors
#[derive(Error, Debug)]
pub enum InternalError {
    /// A background worker no longer accepts tasks
    #[error("Background worker {worker} is unavailable: its task queue is closed")]
    WorkerUnavailable { worker: usize },
}

impl InternalError {
    /// Create a worker unavailable error
    pub fn worker_unavailable(worker: usize) -> Self {
        Self::WorkerUnavailable { worker }
    }
}
