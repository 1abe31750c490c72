use super::queue::TaskQueue;

use std::sync::Arc;

/// A long-lived thread of a [`WorkerPool`](super::WorkerPool).
///
/// A worker holds no state of its own besides its identifier. It keeps
/// taking jobs from the shared queue until the queue shuts down.
pub(crate) struct Worker {
    /// Position of the worker in the pool, used in logs and thread names.
    id: usize,

    /// Queue shared by every worker of the pool.
    queue: Arc<TaskQueue>,
}

impl Worker {
    pub(crate) fn new(id: usize, queue: Arc<TaskQueue>) -> Self {
        Self { id, queue }
    }

    /// Runs the worker loop.
    ///
    /// # Execution loop
    ///
    /// - Block on the queue until a job arrives
    /// - Run it; the job records its own outcome and never unwinds
    /// - Exit once the queue reports shutdown
    pub(crate) fn run(self) {
        log::trace!("worker {} started", self.id);

        let mut executed = 0usize;
        while let Some(job) = self.queue.pop() {
            job();
            executed += 1;
        }

        log::trace!("worker {} exiting after {executed} job(s)", self.id);
    }
}
