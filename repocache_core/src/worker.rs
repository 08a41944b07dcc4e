//! Background execution of cache mutations
//!
//! Persist and evict never touch the disk on the caller's thread. They are
//! packaged as [`Task`]s and handed to a [`TaskExecutor`] together with a
//! routing key. [`WorkerPool`] keeps one FIFO queue per worker thread and
//! always routes the same key to the same queue, so tasks submitted for one
//! handle run in submission order. Tasks for different keys may interleave.

use crate::error::{Error, InternalError, Result, ValidationError};
use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::panic::{AssertUnwindSafe, catch_unwind};
use tokio::sync::{mpsc, oneshot};

/// Unit of background work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs cache tasks off the caller's thread of control
pub trait TaskExecutor: Send + Sync {
    /// Queue `task` behind every earlier task submitted with the same `key`
    fn submit(&self, key: &str, task: Task) -> Result<()>;

    /// A barrier that resolves once every task submitted so far has run
    fn barrier(&self) -> Barrier;
}

/// Completion signal for all tasks queued before it was created
#[must_use = "a barrier does nothing unless waited on"]
#[derive(Debug, Default)]
pub struct Barrier {
    pending: Vec<oneshot::Receiver<()>>,
}

impl Barrier {
    /// A barrier that is already reached
    pub fn reached() -> Self {
        Self::default()
    }

    /// Block the current thread until the barrier is reached
    ///
    /// Must not be called from inside an async runtime; use
    /// [`wait_async`](Self::wait_async) there.
    pub fn wait(self) {
        for rx in self.pending {
            // A closed channel means the worker is gone; nothing left to wait for.
            let _ = rx.blocking_recv();
        }
    }

    /// Wait for the barrier without blocking the runtime
    pub async fn wait_async(self) {
        for rx in self.pending {
            let _ = rx.await;
        }
    }
}

enum Job {
    Run(Task),
    Barrier(oneshot::Sender<()>),
}

/// Fixed set of worker threads, each draining its own FIFO queue
///
/// Worker threads are detached: they do not keep the process alive, and
/// queued work is lost if the process exits first. Dropping the pool closes
/// the queues; workers finish what is already queued and then stop.
pub struct WorkerPool {
    queues: Vec<mpsc::UnboundedSender<Job>>,
}

impl WorkerPool {
    /// Spawn `threads` worker threads
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(
                ValidationError::invalid_configuration("worker_threads must be at least 1").into(),
            );
        }

        let mut queues = Vec::with_capacity(threads);
        for index in 0..threads {
            let (tx, rx) = mpsc::unbounded_channel();
            std::thread::Builder::new()
                .name(format!("repocache-worker-{index}"))
                .spawn(move || run_worker(index, rx))
                .map_err(Error::from)?;
            queues.push(tx);
        }

        log::debug!("Started {threads} cache worker threads");
        Ok(Self { queues })
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.queues.len()
    }

    /// Index of the worker that owns `key`
    pub fn worker_for(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.queues.len() as u64) as usize
    }
}

impl TaskExecutor for WorkerPool {
    fn submit(&self, key: &str, task: Task) -> Result<()> {
        let worker = self.worker_for(key);
        self.queues[worker]
            .send(Job::Run(task))
            .map_err(|_| InternalError::worker_unavailable(worker))?;
        Ok(())
    }

    fn barrier(&self) -> Barrier {
        let pending = self
            .queues
            .iter()
            .filter_map(|queue| {
                let (tx, rx) = oneshot::channel();
                queue.send(Job::Barrier(tx)).ok().map(|_| rx)
            })
            .collect();
        Barrier { pending }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.queues.len())
            .finish()
    }
}

fn run_worker(index: usize, mut rx: mpsc::UnboundedReceiver<Job>) {
    log::trace!("Cache worker {index} started");
    while let Some(job) = rx.blocking_recv() {
        match job {
            Job::Run(task) => {
                if let Err(panic) = catch_unwind(AssertUnwindSafe(task)) {
                    log::error!(
                        "Cache task on worker {index} panicked: {}",
                        panic_message(panic.as_ref())
                    );
                }
            }
            Job::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
    log::trace!("Cache worker {index} stopped");
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}

/// Runs every task immediately on the submitting thread
///
/// Gives tests read-your-writes without waiting on a barrier.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl TaskExecutor for InlineExecutor {
    fn submit(&self, _key: &str, task: Task) -> Result<()> {
        task();
        Ok(())
    }

    fn barrier(&self) -> Barrier {
        Barrier::reached()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_rejects_zero_threads() {
        let err = WorkerPool::new(0).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_routing_is_stable() {
        let pool = WorkerPool::new(4).unwrap();
        let first = pool.worker_for("abc");
        for _ in 0..10 {
            assert_eq!(pool.worker_for("abc"), first);
        }
        assert!(first < pool.threads());
    }

    #[test]
    fn test_same_key_runs_in_submission_order() {
        let pool = WorkerPool::new(3).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..200 {
            let seen = Arc::clone(&seen);
            pool.submit("handle", Box::new(move || seen.lock().unwrap().push(i))).unwrap();
        }
        pool.barrier().wait();

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_barrier_covers_every_worker() {
        let pool = WorkerPool::new(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for i in 0..64 {
            let counter = Arc::clone(&counter);
            pool.submit(
                &format!("key-{i}"),
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        }
        pool.barrier().wait();

        assert_eq!(counter.load(Ordering::SeqCst), 64);
    }

    #[test]
    fn test_worker_survives_panicking_task() {
        let pool = WorkerPool::new(1).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        pool.submit("k", Box::new(|| panic!("boom"))).unwrap();
        let after = Arc::clone(&counter);
        pool.submit(
            "k",
            Box::new(move || {
                after.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
        pool.barrier().wait();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_inline_executor_runs_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&counter);

        InlineExecutor
            .submit(
                "k",
                Box::new(move || {
                    inner.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        InlineExecutor.barrier().wait();
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");

        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "<non-string panic payload>");
    }
}
