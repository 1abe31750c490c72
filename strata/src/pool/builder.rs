use super::WorkerPool;
use crate::error::Result;

use std::thread;

/// Default prefix of worker thread names.
const DEFAULT_THREAD_NAME: &str = "strata-worker";

/// Builder for configuring and creating a [`WorkerPool`].
///
/// # Examples
///
/// ```rust,ignore
/// let pool = PoolBuilder::new()
///     .worker_threads(4)
///     .thread_name("resize")
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct PoolBuilder {
    /// Number of worker threads in the pool.
    worker_threads: usize,

    /// Prefix of worker thread names; workers are named `<prefix>-<id>`.
    thread_name: String,
}

impl PoolBuilder {
    /// Creates a new `PoolBuilder` with default configuration.
    ///
    /// By default, the number of worker threads is set to the number
    /// of available logical CPUs, falling back to `1` if unavailable.
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            worker_threads,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }

    /// Sets the number of worker threads used by the pool.
    ///
    /// A count of zero is rejected by [`build`](Self::build).
    pub fn worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = n;
        self
    }

    /// Sets the prefix used to name worker threads.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Spawns the workers and returns the running pool.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`](crate::Error::InvalidArgument) if the
    ///   thread count is zero; no thread is spawned.
    /// - [`Error::Spawn`](crate::Error::Spawn) if a worker thread could not
    ///   be started; the workers already running are shut down first.
    pub fn build(self) -> Result<WorkerPool> {
        WorkerPool::start(self.worker_threads, &self.thread_name)
    }
}

impl Default for PoolBuilder {
    /// Creates a default `PoolBuilder`.
    fn default() -> Self {
        Self::new()
    }
}
