//! Fixed-size worker pool.
//!
//! This module contains the components behind [`WorkerPool::map`]:
//! - [`queue`]: the FIFO hand-off between callers and workers,
//! - [`worker`]: the loop run by every pool thread,
//! - [`call`]: per-call result slots, completion counter and tasks,
//! - [`builder`]: pool configuration.
//!
//! Calls submitted concurrently share the queue, but each call owns its
//! own slots and counter, so one call's failure or cancellation never
//! leaks into another.

pub(crate) mod builder;
pub(crate) mod call;
pub(crate) mod queue;
pub(crate) mod worker;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use builder::PoolBuilder;
use call::{Call, Task};
use queue::TaskQueue;
use worker::Worker;

use parking_lot::Mutex;
use std::convert::Infallible;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// A fixed set of worker threads applying functions to sequences.
///
/// The `WorkerPool` is responsible for:
/// - spawning its workers at construction,
/// - splitting each `map` call into one task per element,
/// - blocking the caller until the call's results are complete,
/// - shutting the workers down on [`close`](Self::close) or drop.
///
/// The pool is `Sync`; share it across threads behind an `Arc`.
///
/// # Examples
///
/// ```rust,ignore
/// let pool = WorkerPool::new(4)?;
/// let squares = pool.map(vec![1, 2, 3], |x| x * x)?;
/// assert_eq!(squares, vec![1, 4, 9]);
/// ```
pub struct WorkerPool {
    /// Queue shared with every worker.
    queue: Arc<TaskQueue>,

    /// Join handles of the workers, emptied by `close`.
    handles: Mutex<Vec<JoinHandle<()>>>,

    /// Set by the first `close`.
    closed: AtomicBool,

    worker_threads: usize,
}

impl WorkerPool {
    /// Creates a pool with `threads` workers and default settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `threads` is zero.
    pub fn new(threads: usize) -> Result<Self> {
        PoolBuilder::new().worker_threads(threads).build()
    }

    /// Returns a builder for a customised pool.
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    pub(crate) fn start(threads: usize, thread_name: &str) -> Result<Self> {
        if threads == 0 {
            return Err(Error::InvalidArgument(
                "worker pool needs at least one thread, 0 were given".to_owned(),
            ));
        }

        let queue = Arc::new(TaskQueue::new());
        let mut handles = Vec::with_capacity(threads);

        for id in 0..threads {
            let worker = Worker::new(id, queue.clone());

            let spawned = thread::Builder::new()
                .name(format!("{thread_name}-{id}"))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    log::warn!("failed to spawn worker {id}: {err}");
                    queue.shutdown();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(Error::Spawn(err));
                }
            }
        }

        log::debug!("worker pool started with {threads} thread(s)");

        Ok(Self {
            queue,
            handles: Mutex::new(handles),
            closed: AtomicBool::new(false),
            worker_threads: threads,
        })
    }

    /// Number of worker threads the pool was built with.
    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of tasks queued but not yet picked up by a worker.
    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    /// Applies `f` to every item in parallel and returns the results in
    /// input order.
    ///
    /// Blocks until every item has been processed. An empty input returns
    /// immediately without touching the queue.
    ///
    /// # Errors
    ///
    /// - [`Error::PoolClosed`] if the pool is closed.
    /// - [`Error::TaskFailed`] if `f` panicked for some item; the first
    ///   failure is reported once the call's other tasks have drained, and
    ///   no partial result is returned.
    pub fn map<T, R, F>(&self, items: impl IntoIterator<Item = T>, f: F) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        self.dispatch(None, items, move |item| Ok::<R, Infallible>(f(item)))
    }

    /// Like [`map`](Self::map), but gives up waiting as soon as `token` is
    /// cancelled, returning [`Error::Interrupted`].
    pub fn map_cancellable<T, R, F>(
        &self,
        token: &CancelToken,
        items: impl IntoIterator<Item = T>,
        f: F,
    ) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        self.dispatch(Some(token), items, move |item| Ok::<R, Infallible>(f(item)))
    }

    /// Like [`map`](Self::map), for a fallible function.
    ///
    /// An `Err` returned by `f` is a task failure, exactly like a panic.
    pub fn try_map<T, R, E, F>(&self, items: impl IntoIterator<Item = T>, f: F) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>>,
        F: Fn(T) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        self.dispatch(None, items, f)
    }

    /// Like [`try_map`](Self::try_map), but gives up waiting as soon as
    /// `token` is cancelled.
    ///
    /// A cancelled call returns [`Error::Interrupted`]. Its tasks still in
    /// the queue are skipped by the workers, and the pool stays usable.
    pub fn try_map_cancellable<T, R, E, F>(
        &self,
        token: &CancelToken,
        items: impl IntoIterator<Item = T>,
        f: F,
    ) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>>,
        F: Fn(T) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        self.dispatch(Some(token), items, f)
    }

    fn dispatch<T, R, E, F>(
        &self,
        token: Option<&CancelToken>,
        items: impl IntoIterator<Item = T>,
        f: F,
    ) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>>,
        F: Fn(T) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        if self.is_closed() {
            return Err(Error::PoolClosed);
        }

        if token.is_some_and(CancelToken::is_cancelled) {
            return Err(Error::Interrupted);
        }

        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let call = Arc::new(Call::new(items.len()));
        let f = Arc::new(f);

        let _subscription = token.map(|token| {
            let call = call.clone();
            token.subscribe(move || call.wake())
        });

        for (index, item) in items.into_iter().enumerate() {
            let task = Task::new(item, index, f.clone(), call.clone());

            // A rejected job drops its task, which reports `PoolClosed`.
            if self.queue.push(Box::new(move || task.run())).is_err() {
                log::debug!("pool closed while submitting task {index}");
            }
        }

        call.wait(token)
    }

    /// Shuts the pool down.
    ///
    /// Queued tasks are dropped and their callers receive
    /// [`Error::PoolClosed`]. Workers finish the task they are running,
    /// then exit and are joined. Later `map` calls fail with
    /// [`Error::PoolClosed`].
    ///
    /// Closing twice is harmless. Closing from inside a task does not wait
    /// for the calling worker.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let dropped = self.queue.shutdown();
        log::debug!("closing worker pool, {} queued task(s) dropped", dropped.len());
        drop(dropped);

        let handles = std::mem::take(&mut *self.handles.lock());
        let current = thread::current().id();

        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }

            if handle.join().is_err() {
                log::warn!("worker thread exited by panicking");
            }
        }
    }
}

impl Drop for WorkerPool {
    /// Closes the pool and joins its workers.
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("worker_threads", &self.worker_threads)
            .field("closed", &self.is_closed())
            .finish()
    }
}
