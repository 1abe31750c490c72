//! Chunked parallel reduction.
//!
//! A [`ChunkReducer`] splits its input into contiguous chunks (see
//! [`partition`]), reduces every chunk in parallel with a *leaf* function,
//! then folds the per-chunk results left to right with a *combine*
//! function.
//!
//! Where the chunks run is part of the reducer's type:
//!
//! - [`Scoped`] starts a group of scoped threads for every call. The chunks
//!   borrow the input, so any `T: Sync` works, borrowed data included.
//! - [`Pooled`] runs the chunks as tasks of a shared [`WorkerPool`]. Pool
//!   tasks outlive any borrow of the caller, so the input is copied once
//!   and must be `Clone + 'static`.

mod chunk;
mod group;

pub use chunk::{Chunk, ChunkIter, partition};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::pool::WorkerPool;
use group::ChunkGroup;

use std::ops::Range;
use std::sync::Arc;
use std::thread;

/// Chunks run on threads started for each call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scoped;

/// Chunks run as tasks of a shared [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct Pooled {
    pool: Arc<WorkerPool>,
}

/// Reduces sequences by chunks in parallel.
///
/// # Examples
///
/// ```rust,ignore
/// let reducer = ChunkReducer::new();
/// let sum = reducer.reduce(4, &[1, 2, 3, 4, 5], |chunk| chunk.iter().sum::<i32>(), |a, b| a + b)?;
/// assert_eq!(sum, Some(15));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChunkReducer<B = Scoped> {
    /// Where the chunks run.
    backend: B,

    /// Token cancelling every reduction made by this reducer.
    cancel: Option<CancelToken>,
}

impl ChunkReducer {
    /// Creates a reducer that starts its own threads for every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduces `items` with at most `threads` chunks running in parallel.
    ///
    /// `leaf` reduces one chunk; `combine` folds two chunk results, and is
    /// applied left to right in chunk order. Returns `Ok(None)` for an
    /// empty input without starting any thread.
    ///
    /// Every chunk thread is joined before this returns, so `items` and
    /// `leaf` may borrow from the caller.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `threads` is zero.
    /// - [`Error::TaskFailed`] if `leaf` panicked on some chunk; `index`
    ///   is the chunk position.
    /// - [`Error::Interrupted`] if the reducer's token was cancelled.
    /// - [`Error::Spawn`] if a chunk thread could not be started.
    pub fn reduce<T, R, L, C>(
        &self,
        threads: usize,
        items: &[T],
        leaf: L,
        combine: C,
    ) -> Result<Option<R>>
    where
        T: Sync,
        R: Send,
        L: Fn(Chunk<'_, T>) -> R + Sync,
        C: FnMut(R, R) -> R,
    {
        self.fold_chunks(threads, items.len(), combine, |ranges, token| {
            on_scoped_threads(items, ranges, &leaf, token)
        })
    }
}

impl ChunkReducer<Pooled> {
    /// Creates a reducer that runs its chunks on `pool`.
    pub fn with_pool(pool: Arc<WorkerPool>) -> Self {
        Self {
            backend: Pooled { pool },
            cancel: None,
        }
    }

    /// The pool running this reducer's chunks.
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.backend.pool
    }

    /// Reduces `items` with at most `threads` chunks running on the pool.
    ///
    /// Same contract as [`ChunkReducer::reduce`], except that `items` is
    /// copied once so the pool's tasks can own it.
    ///
    /// # Errors
    ///
    /// The errors of [`ChunkReducer::reduce`], plus [`Error::PoolClosed`]
    /// if the pool is closed.
    pub fn reduce<T, R, L, C>(
        &self,
        threads: usize,
        items: &[T],
        leaf: L,
        combine: C,
    ) -> Result<Option<R>>
    where
        T: Clone + Send + Sync + 'static,
        R: Send + 'static,
        L: Fn(Chunk<'_, T>) -> R + Send + Sync + 'static,
        C: FnMut(R, R) -> R,
    {
        self.fold_chunks(threads, items.len(), combine, |ranges, token| {
            on_pool(&self.backend.pool, items, ranges, leaf, token)
        })
    }
}

impl<B> ChunkReducer<B> {
    /// Makes every reduction of this reducer observe `token`.
    ///
    /// Once the token is cancelled, running reductions stop their chunks
    /// and return [`Error::Interrupted`].
    pub fn cancel_on(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Validates the call, runs the chunks with `run` and folds their
    /// results left to right.
    fn fold_chunks<R, C, F>(
        &self,
        threads: usize,
        len: usize,
        combine: C,
        run: F,
    ) -> Result<Option<R>>
    where
        C: FnMut(R, R) -> R,
        F: FnOnce(Vec<Range<usize>>, &CancelToken) -> Result<Vec<R>>,
    {
        if threads == 0 {
            return Err(Error::InvalidArgument(
                "number of threads must be at least one, 0 were given".to_owned(),
            ));
        }

        let ranges = partition(len, threads);
        if ranges.is_empty() {
            return Ok(None);
        }

        // Local token shared by this call's chunks; the reducer's own token
        // is linked to it for the duration of the call.
        let token = CancelToken::new();
        let _link = self.cancel.as_ref().map(|parent| {
            let child = token.clone();
            let link = parent.subscribe(move || child.cancel());
            if parent.is_cancelled() {
                token.cancel();
            }
            link
        });

        if token.is_cancelled() {
            return Err(Error::Interrupted);
        }

        let partials = run(ranges, &token)?;

        if token.is_cancelled() {
            return Err(Error::Interrupted);
        }

        Ok(partials.into_iter().reduce(combine))
    }
}

fn on_pool<T, R, L>(
    pool: &WorkerPool,
    items: &[T],
    ranges: Vec<Range<usize>>,
    leaf: L,
    token: &CancelToken,
) -> Result<Vec<R>>
where
    T: Clone + Send + Sync + 'static,
    R: Send + 'static,
    L: Fn(Chunk<'_, T>) -> R + Send + Sync + 'static,
{
    // Pool tasks must own their data: the caller may stop waiting early.
    let items: Arc<[T]> = Arc::from(items);
    let chunk_token = token.clone();

    pool.map_cancellable(token, ranges, move |range: Range<usize>| {
        leaf(Chunk::new(&items[range.clone()], range.start, &chunk_token))
    })
}

fn on_scoped_threads<T, R, L>(
    items: &[T],
    ranges: Vec<Range<usize>>,
    leaf: &L,
    token: &CancelToken,
) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    L: Fn(Chunk<'_, T>) -> R + Sync,
{
    thread::scope(|scope| {
        let mut group = ChunkGroup::new(scope, token.clone());

        for range in ranges {
            let chunk = Chunk::new(&items[range.clone()], range.start, token);
            group.spawn(move || leaf(chunk))?;
        }

        log::trace!("joining {} chunk thread(s)", group.len());
        group.join_all()
    })
}
