use crate::cancel::CancelToken;
use crate::error::{Error, Result, TaskError};

use parking_lot::{Condvar, Mutex};
use std::error::Error as StdError;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Shared state of one `map` call.
///
/// Holds the result slots and the completion counter under a single lock.
/// The caller sleeps on `done` until every task of the call has been
/// accounted for, or until its cancel token fires.
pub(crate) struct Call<R> {
    progress: Mutex<Progress<R>>,
    done: Condvar,
    len: usize,
}

struct Progress<R> {
    /// One slot per input element, written at most once.
    slots: Vec<Option<R>>,

    /// Tasks accounted for so far. Never exceeds `len`.
    completed: usize,

    /// First failure observed for the call.
    failure: Option<Error>,

    /// Set when the caller stopped waiting.
    cancelled: bool,
}

impl<R> Call<R> {
    pub(crate) fn new(len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || None);

        Self {
            progress: Mutex::new(Progress {
                slots,
                completed: 0,
                failure: None,
                cancelled: false,
            }),
            done: Condvar::new(),
            len,
        }
    }

    /// Returns `true` when outputs of this call will be discarded anyway.
    pub(crate) fn is_settled(&self) -> bool {
        let progress = self.progress.lock();
        progress.failure.is_some() || progress.cancelled
    }

    /// Records the outcome of the task at `index`.
    ///
    /// The first error wins; later errors and any value produced after a
    /// failure or cancellation are dropped.
    pub(crate) fn complete(&self, index: usize, outcome: Result<R>) {
        let mut progress = self.progress.lock();
        debug_assert!(progress.completed < self.len);

        match outcome {
            Ok(value) => {
                if progress.failure.is_none() && !progress.cancelled {
                    debug_assert!(progress.slots[index].is_none());
                    progress.slots[index] = Some(value);
                }
            }
            Err(err) => {
                if progress.failure.is_none() {
                    log::debug!("task {index} failed: {err}");
                    progress.failure = Some(err);
                    progress.slots.clear();
                }
            }
        }

        self.count_one(progress);
    }

    /// Accounts for a task that was not run because the call is settled.
    pub(crate) fn skip(&self) {
        let progress = self.progress.lock();
        self.count_one(progress);
    }

    fn count_one(&self, mut progress: parking_lot::MutexGuard<'_, Progress<R>>) {
        progress.completed += 1;

        if progress.completed == self.len {
            drop(progress);
            self.done.notify_all();
        }
    }

    /// Wakes the caller so it re-checks its cancel token.
    pub(crate) fn wake(&self) {
        let _progress = self.progress.lock();
        self.done.notify_all();
    }

    /// Blocks until every task is accounted for, then returns the slots in
    /// index order or the first failure.
    pub(crate) fn wait(&self, token: Option<&CancelToken>) -> Result<Vec<R>> {
        let mut progress = self.progress.lock();

        while progress.completed < self.len {
            if token.is_some_and(CancelToken::is_cancelled) {
                progress.cancelled = true;
                progress.slots.clear();
                log::debug!(
                    "call cancelled with {}/{} task(s) done",
                    progress.completed,
                    self.len
                );
                return Err(Error::Interrupted);
            }

            self.done.wait(&mut progress);
        }

        if let Some(err) = progress.failure.take() {
            return Err(err);
        }

        Ok(mem::take(&mut progress.slots)
            .into_iter()
            .map(|slot| slot.expect("every slot is written before the call completes"))
            .collect())
    }
}

/// One element of a `map` call waiting in the queue.
///
/// A task that is dropped before it runs (the pool was closed while it was
/// queued) reports [`Error::PoolClosed`] for its slot so the caller is
/// released.
pub(crate) struct Task<T, R, F> {
    item: Option<T>,
    index: usize,
    f: Arc<F>,
    call: Arc<Call<R>>,
}

impl<T, R, F> Task<T, R, F> {
    pub(crate) fn new(item: T, index: usize, f: Arc<F>, call: Arc<Call<R>>) -> Self {
        Self {
            item: Some(item),
            index,
            f,
            call,
        }
    }
}

impl<T, R, E, F> Task<T, R, F>
where
    F: Fn(T) -> std::result::Result<R, E>,
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    /// Applies the function and writes the outcome into the call's slot.
    pub(crate) fn run(mut self) {
        let Some(item) = self.item.take() else {
            return;
        };

        if self.call.is_settled() {
            self.call.skip();
            return;
        }

        let f = &*self.f;
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| f(item))) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(TaskError::Failed(err.into())),
            Err(payload) => Err(TaskError::from_panic(payload)),
        };

        let index = self.index;
        self.call.complete(
            index,
            outcome.map_err(|source| Error::TaskFailed { index, source }),
        );
    }
}

impl<T, R, F> Drop for Task<T, R, F> {
    fn drop(&mut self) {
        if self.item.is_some() {
            self.call.complete(self.index, Err(Error::PoolClosed));
        }
    }
}
