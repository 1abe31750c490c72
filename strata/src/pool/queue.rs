use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

/// A unit of work handed to a worker thread.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// FIFO hand-off between callers of `map` and the pool's workers.
///
/// Every mutation happens under a single lock. Workers waiting for work
/// sleep on the condition variable and are woken one at a time by
/// [`push`](Self::push), or all at once by [`shutdown`](Self::shutdown).
pub(crate) struct TaskQueue {
    /// Pending jobs and the shutdown flag, guarded together.
    state: Mutex<QueueState>,

    /// Signalled when a job arrives or the queue shuts down.
    condvar: Condvar,
}

struct QueueState {
    jobs: VecDeque<Job>,
    shutdown: bool,
}

impl TaskQueue {
    /// Creates an empty, open queue.
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                shutdown: false,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Appends a job and wakes one waiting worker.
    ///
    /// Once the queue is shut down the job is handed back untouched.
    pub(crate) fn push(&self, job: Job) -> Result<(), Job> {
        let mut state = self.state.lock();

        if state.shutdown {
            return Err(job);
        }

        state.jobs.push_back(job);
        drop(state);

        self.condvar.notify_one();
        Ok(())
    }

    /// Takes the oldest job, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue has been shut down.
    pub(crate) fn pop(&self) -> Option<Job> {
        let mut state = self.state.lock();

        loop {
            if state.shutdown {
                return None;
            }

            if let Some(job) = state.jobs.pop_front() {
                return Some(job);
            }

            self.condvar.wait(&mut state);
        }
    }

    /// Closes the queue and wakes every waiting worker.
    ///
    /// Jobs still queued are returned so the caller can drop them outside
    /// the lock. Later calls return an empty list.
    pub(crate) fn shutdown(&self) -> Vec<Job> {
        let mut state = self.state.lock();
        state.shutdown = true;
        let pending = state.jobs.drain(..).collect();
        drop(state);

        self.condvar.notify_all();
        pending
    }

    /// Number of jobs waiting for a worker.
    pub(crate) fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_jobs_come_out_in_order() {
        let queue = TaskQueue::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..4 {
            let seen = seen.clone();
            assert!(queue.push(Box::new(move || seen.lock().push(i))).is_ok());
        }

        assert_eq!(queue.len(), 4);
        while queue.len() > 0 {
            let job = queue.pop().unwrap();
            job();
        }

        assert_eq!(*seen.lock(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_push_after_shutdown_is_rejected() {
        let queue = TaskQueue::new();
        queue.shutdown();

        assert!(queue.push(Box::new(|| {})).is_err());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_shutdown_hands_back_pending_jobs() {
        let queue = TaskQueue::new();
        let _ = queue.push(Box::new(|| {}));
        let _ = queue.push(Box::new(|| {}));

        assert_eq!(queue.shutdown().len(), 2);
        assert!(queue.shutdown().is_empty());
    }

    #[test]
    fn test_shutdown_wakes_blocked_consumers() {
        let queue = Arc::new(TaskQueue::new());
        let exited = Arc::new(AtomicUsize::new(0));

        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = queue.clone();
                let exited = exited.clone();
                thread::spawn(move || {
                    while let Some(job) = queue.pop() {
                        job();
                    }
                    exited.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        queue.shutdown();

        for consumer in consumers {
            consumer.join().unwrap();
        }

        assert_eq!(exited.load(Ordering::SeqCst), 3);
    }
}
