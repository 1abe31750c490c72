use crate::cancel::CancelToken;
use crate::error::{Error, Result, TaskError};

use std::thread::{self, Scope, ScopedJoinHandle};

/// A batch of chunk threads owned by one reduction call.
///
/// Threads are spawned inside a [`thread::scope`], so none of them can
/// outlive the call. The group shares one cancel token with its chunks:
/// [`abort_all`](Self::abort_all) cancels it, which makes every chunk
/// still iterating stop early.
pub(crate) struct ChunkGroup<'scope, 'env, R> {
    scope: &'scope Scope<'scope, 'env>,

    /// Token observed by every chunk of the group.
    token: CancelToken,

    /// Handles in chunk order.
    handles: Vec<ScopedJoinHandle<'scope, R>>,
}

impl<'scope, 'env, R: Send + 'scope> ChunkGroup<'scope, 'env, R> {
    pub(crate) fn new(scope: &'scope Scope<'scope, 'env>, token: CancelToken) -> Self {
        Self {
            scope,
            token,
            handles: Vec::new(),
        }
    }

    /// Starts a thread for the next chunk.
    ///
    /// If the thread cannot be started, the chunks already running are
    /// aborted and joined before the error is returned.
    pub(crate) fn spawn<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce() -> R + Send + 'scope,
    {
        let index = self.handles.len();

        let spawned = thread::Builder::new()
            .name(format!("strata-chunk-{index}"))
            .spawn_scoped(self.scope, f);

        match spawned {
            Ok(handle) => {
                self.handles.push(handle);
                Ok(())
            }
            Err(err) => {
                log::warn!("failed to spawn chunk thread {index}: {err}");
                self.abort_all();
                for handle in self.handles.drain(..) {
                    let _ = handle.join();
                }
                Err(Error::Spawn(err))
            }
        }
    }

    /// Number of chunk threads in the group.
    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    /// Signals every chunk of the group to stop.
    pub(crate) fn abort_all(&self) {
        self.token.cancel();
    }

    /// Joins every thread, returning their results in chunk order.
    ///
    /// All threads are joined even when one of them panicked; the first
    /// panic (in chunk order) is then reported as a task failure.
    pub(crate) fn join_all(self) -> Result<Vec<R>> {
        let mut results = Vec::with_capacity(self.handles.len());
        let mut failure = None;

        for (index, handle) in self.handles.into_iter().enumerate() {
            match handle.join() {
                Ok(value) => results.push(value),
                Err(payload) => {
                    if failure.is_none() {
                        let source = TaskError::from_panic(payload);
                        log::debug!("chunk {index} failed: {source}");
                        failure = Some(Error::TaskFailed { index, source });
                    }
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(results),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_results_follow_spawn_order() {
        let results = thread::scope(|scope| {
            let mut group = ChunkGroup::new(scope, CancelToken::new());
            for i in 0..4u64 {
                group
                    .spawn(move || {
                        thread::sleep(std::time::Duration::from_millis(20 - 5 * i));
                        i
                    })
                    .unwrap();
            }
            assert_eq!(group.len(), 4);
            group.join_all()
        });

        assert_eq!(results.unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_panic_is_reported_after_all_joined() {
        let finished = AtomicBool::new(false);

        let result = thread::scope(|scope| {
            let mut group = ChunkGroup::new(scope, CancelToken::new());
            group.spawn(|| panic!("chunk exploded")).unwrap();
            group
                .spawn(|| {
                    thread::sleep(std::time::Duration::from_millis(20));
                    finished.store(true, Ordering::SeqCst);
                })
                .unwrap();
            group.join_all()
        });

        assert!(finished.load(Ordering::SeqCst));
        assert!(matches!(result, Err(Error::TaskFailed { index: 0, .. })));
    }

    #[test]
    fn test_abort_all_cancels_the_shared_token() {
        let token = CancelToken::new();

        thread::scope(|scope| {
            let group: ChunkGroup<'_, '_, ()> = ChunkGroup::new(scope, token.clone());
            group.abort_all();
        });

        assert!(token.is_cancelled());
    }
}
