use crate::cancel::CancelToken;

use std::ops::{Deref, Range};
use std::slice;

/// Splits `len` items into at most `threads` contiguous ranges.
///
/// Every range but the last holds `ceil(len / threads)` items. The ranges
/// cover `0..len` exactly, in order, without gaps or overlaps. Fewer than
/// `threads` ranges come back only when there are fewer items than
/// threads, and none for an empty input or zero threads.
///
/// # Examples
///
/// ```rust,ignore
/// assert_eq!(partition(8, 3), vec![0..3, 3..6, 6..8]);
/// assert_eq!(partition(2, 5), vec![0..1, 1..2]);
/// ```
pub fn partition(len: usize, threads: usize) -> Vec<Range<usize>> {
    if len == 0 || threads == 0 {
        return Vec::new();
    }

    let size = len.div_ceil(threads);

    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

/// A contiguous, read-only piece of a reduction's input.
///
/// Dereferences to the underlying slice. [`iter`](Self::iter) stops early
/// once the reduction is cancelled, so leaf reducers written against it
/// return promptly; their partial result is discarded in that case.
pub struct Chunk<'a, T> {
    items: &'a [T],
    offset: usize,
    token: &'a CancelToken,
}

impl<'a, T> Chunk<'a, T> {
    pub(crate) fn new(items: &'a [T], offset: usize, token: &'a CancelToken) -> Self {
        Self {
            items,
            offset,
            token,
        }
    }

    /// Position of the chunk's first item in the whole input.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The chunk's items.
    pub fn as_slice(&self) -> &'a [T] {
        self.items
    }

    /// Returns `true` once the reduction this chunk belongs to is cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Iterates over the chunk, stopping as soon as the reduction is
    /// cancelled.
    pub fn iter(&self) -> ChunkIter<'a, T> {
        ChunkIter {
            inner: self.items.iter(),
            token: self.token,
        }
    }
}

impl<T> Deref for Chunk<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.items
    }
}

/// Iterator returned by [`Chunk::iter`].
pub struct ChunkIter<'a, T> {
    inner: slice::Iter<'a, T>,
    token: &'a CancelToken,
}

impl<'a, T> Iterator for ChunkIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.token.is_cancelled() {
            return None;
        }

        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_exact_cover(len: usize, threads: usize) {
        let ranges = partition(len, threads);

        assert!(ranges.len() <= threads);
        assert!(ranges.iter().all(|r| !r.is_empty()));

        let mut next = 0;
        for range in &ranges {
            assert_eq!(range.start, next);
            next = range.end;
        }
        assert_eq!(next, len);
    }

    #[test]
    fn test_partition_covers_input_exactly() {
        for len in 0..40 {
            for threads in 1..12 {
                assert_exact_cover(len, threads);
            }
        }
    }

    #[test]
    fn test_partition_examples() {
        assert_eq!(partition(8, 3), vec![0..3, 3..6, 6..8]);
        assert_eq!(partition(2, 5), vec![0..1, 1..2]);
        assert_eq!(partition(6, 1), vec![0..6]);
        assert!(partition(0, 4).is_empty());
        assert!(partition(4, 0).is_empty());
    }

    #[test]
    fn test_chunk_count_matches_ceil_formula() {
        // 10 items over 4 threads: size 3, so only 4 chunks of 3,3,3,1.
        assert_eq!(partition(10, 4), vec![0..3, 3..6, 6..9, 9..10]);
        // 9 items over 6 threads: size 2, so 5 chunks.
        assert_eq!(partition(9, 6).len(), 5);
    }

    #[test]
    fn test_iteration_stops_on_cancel() {
        let token = CancelToken::new();
        let data = [1, 2, 3, 4];
        let chunk = Chunk::new(&data[1..], 1, &token);

        assert_eq!(chunk.offset(), 1);
        assert_eq!(chunk.len(), 3);

        let mut iter = chunk.iter();
        assert_eq!(iter.next(), Some(&2));

        token.cancel();
        assert!(chunk.is_cancelled());
        assert_eq!(iter.next(), None);
        assert_eq!(chunk.as_slice(), &[2, 3, 4]);
    }
}
