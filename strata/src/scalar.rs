//! Parallel scalar reductions.
//!
//! Every operation is one [`ChunkReducer`] call with a fixed leaf/combine
//! pair. Ties under the comparator resolve to the element that comes first
//! in the input, whatever the number of threads.

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::pool::WorkerPool;
use crate::reduce::{Chunk, ChunkReducer, Pooled, Scoped};

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::sync::Arc;

/// `max`, `min`, `all`, `any` and `count` over a slice, in parallel.
///
/// Like [`ChunkReducer`], the backend is part of the type: `ScalarOps::new()`
/// borrows its input, `ScalarOps::with_pool(pool)` copies it onto the pool.
///
/// # Examples
///
/// ```rust,ignore
/// let ops = ScalarOps::new();
/// let items = [3, 1, 4, 1, 5, 9, 2, 6];
///
/// assert_eq!(ops.maximum(3, &items, i32::cmp)?, 9);
/// assert_eq!(ops.count(3, &items, |x| x % 2 == 1)?, 5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScalarOps<B = Scoped> {
    reducer: ChunkReducer<B>,
}

impl ScalarOps {
    /// Scalar operations starting their own threads for every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the greatest element under `comparator`.
    ///
    /// The first of several equal maxima is returned.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyInput`] if `items` is empty, plus the errors of
    /// [`ChunkReducer::reduce`].
    pub fn maximum<T, C>(&self, threads: usize, items: &[T], comparator: C) -> Result<T>
    where
        T: Clone + Send + Sync,
        C: Fn(&T, &T) -> Ordering + Sync,
    {
        let best = self.reducer.reduce(
            threads,
            items,
            max_leaf(&comparator),
            max_combine(&comparator),
        )?;

        best.flatten().ok_or(Error::EmptyInput)
    }

    /// Returns the least element under `comparator`.
    ///
    /// The first of several equal minima is returned.
    pub fn minimum<T, C>(&self, threads: usize, items: &[T], comparator: C) -> Result<T>
    where
        T: Clone + Send + Sync,
        C: Fn(&T, &T) -> Ordering + Sync,
    {
        self.maximum(threads, items, move |a, b| comparator(b, a))
    }

    /// Returns `true` if every element matches `predicate` (`true` when empty).
    pub fn all<T, P>(&self, threads: usize, items: &[T], predicate: P) -> Result<bool>
    where
        T: Sync,
        P: Fn(&T) -> bool + Sync,
    {
        let all = self.reducer.reduce(threads, items, all_leaf(predicate), both)?;

        Ok(all.unwrap_or(true))
    }

    /// Returns `true` if some element matches `predicate` (`false` when empty).
    pub fn any<T, P>(&self, threads: usize, items: &[T], predicate: P) -> Result<bool>
    where
        T: Sync,
        P: Fn(&T) -> bool + Sync,
    {
        self.all(threads, items, move |item| !predicate(item))
            .map(|none_match| !none_match)
    }

    /// Counts the elements matching `predicate`.
    pub fn count<T, P>(&self, threads: usize, items: &[T], predicate: P) -> Result<usize>
    where
        T: Sync,
        P: Fn(&T) -> bool + Sync,
    {
        let count = self.reducer.reduce(threads, items, count_leaf(predicate), sum)?;

        Ok(count.unwrap_or(0))
    }
}

impl ScalarOps<Pooled> {
    /// Scalar operations running on a shared pool.
    pub fn with_pool(pool: Arc<WorkerPool>) -> Self {
        Self {
            reducer: ChunkReducer::with_pool(pool),
        }
    }

    /// Pool-backed [`ScalarOps::maximum`]; `items` is copied onto the pool.
    pub fn maximum<T, C>(&self, threads: usize, items: &[T], comparator: C) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        C: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        let comparator = Arc::new(comparator);
        let leaf_cmp = comparator.clone();

        let best = self.reducer.reduce(
            threads,
            items,
            max_leaf(move |a: &T, b: &T| leaf_cmp(a, b)),
            max_combine(&*comparator),
        )?;

        best.flatten().ok_or(Error::EmptyInput)
    }

    /// Pool-backed [`ScalarOps::minimum`].
    pub fn minimum<T, C>(&self, threads: usize, items: &[T], comparator: C) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        C: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.maximum(threads, items, move |a: &T, b: &T| comparator(b, a))
    }

    /// Pool-backed [`ScalarOps::all`].
    pub fn all<T, P>(&self, threads: usize, items: &[T], predicate: P) -> Result<bool>
    where
        T: Clone + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let all = self.reducer.reduce(threads, items, all_leaf(predicate), both)?;

        Ok(all.unwrap_or(true))
    }

    /// Pool-backed [`ScalarOps::any`].
    pub fn any<T, P>(&self, threads: usize, items: &[T], predicate: P) -> Result<bool>
    where
        T: Clone + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.all(threads, items, move |item: &T| !predicate(item))
            .map(|none_match| !none_match)
    }

    /// Pool-backed [`ScalarOps::count`].
    pub fn count<T, P>(&self, threads: usize, items: &[T], predicate: P) -> Result<usize>
    where
        T: Clone + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let count = self.reducer.reduce(threads, items, count_leaf(predicate), sum)?;

        Ok(count.unwrap_or(0))
    }
}

impl<B> ScalarOps<B> {
    /// Makes every operation observe `token`; see [`ChunkReducer::cancel_on`].
    pub fn cancel_on(self, token: CancelToken) -> Self {
        Self {
            reducer: self.reducer.cancel_on(token),
        }
    }
}

fn max_leaf<T, C>(comparator: C) -> impl Fn(Chunk<'_, T>) -> Option<T>
where
    T: Clone,
    C: Fn(&T, &T) -> Ordering,
{
    move |chunk| {
        chunk
            .iter()
            .fold(None, |best, item| Some(pick(&comparator, best, item)))
            .cloned()
    }
}

fn max_combine<T, C>(comparator: C) -> impl FnMut(Option<T>, Option<T>) -> Option<T>
where
    C: Fn(&T, &T) -> Ordering,
{
    move |left, right| match (left, right) {
        (Some(left), Some(right)) => Some(pick(&comparator, Some(left), right)),
        (left, right) => left.or(right),
    }
}

fn all_leaf<T, P>(predicate: P) -> impl Fn(Chunk<'_, T>) -> bool
where
    P: Fn(&T) -> bool,
{
    move |chunk| chunk.iter().all(&predicate)
}

fn count_leaf<T, P>(predicate: P) -> impl Fn(Chunk<'_, T>) -> usize
where
    P: Fn(&T) -> bool,
{
    move |chunk| chunk.iter().filter(|&item| predicate(item)).count()
}

fn both(left: bool, right: bool) -> bool {
    left && right
}

fn sum(left: usize, right: usize) -> usize {
    left + right
}

/// Keeps `best` unless `candidate` is strictly greater.
fn pick<T, B, C>(comparator: &C, best: Option<B>, candidate: B) -> B
where
    B: Borrow<T>,
    C: Fn(&T, &T) -> Ordering + ?Sized,
{
    match best {
        Some(best) if comparator(candidate.borrow(), best.borrow()) != Ordering::Greater => best,
        _ => candidate,
    }
}
