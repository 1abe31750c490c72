use std::any::Any;
use std::error::Error as StdError;
use std::io;

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors reported by the pool, the reducer and the scalar operations.
///
/// Every failure surfaces to the immediate caller. Nothing is retried and
/// nothing is resubmitted.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An argument was rejected before any work was scheduled.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `maximum` or `minimum` was asked to reduce an empty input.
    #[error("no such element: input is empty")]
    EmptyInput,

    /// Caller-supplied logic failed while a task was running.
    ///
    /// Only the first failure observed for a call is kept.
    #[error("task {index} failed: {source}")]
    TaskFailed {
        /// Position of the failing element (or chunk) in the input.
        index: usize,
        /// What went wrong inside the task.
        #[source]
        source: TaskError,
    },

    /// The pool was closed before or while the call was running.
    #[error("worker pool is closed")]
    PoolClosed,

    /// The call's [`CancelToken`](crate::CancelToken) was cancelled.
    #[error("interrupted while waiting for completion")]
    Interrupted,

    /// The operating system refused to start a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Failure raised by a single task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The task function returned an error.
    #[error("{0}")]
    Failed(Box<dyn StdError + Send + Sync>),

    /// The task function panicked.
    #[error("panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Builds a task error from a panic payload caught by `catch_unwind`.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_owned()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "opaque panic payload".to_owned()
        };

        TaskError::Panicked(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic;

    #[test]
    fn test_panic_message_is_kept() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 7)).unwrap_err();

        match TaskError::from_panic(payload) {
            TaskError::Panicked(message) => assert_eq!(message, "boom 7"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_static_str_payload() {
        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();

        assert_eq!(TaskError::from_panic(payload).to_string(), "panicked: static");
    }

    #[test]
    fn test_task_failure_display_includes_index() {
        let err = Error::TaskFailed {
            index: 3,
            source: TaskError::Failed("bad input".into()),
        };

        assert_eq!(err.to_string(), "task 3 failed: bad input");
    }

    #[test]
    fn test_spawn_error_keeps_its_source() {
        let err = Error::Spawn(io::Error::new(io::ErrorKind::WouldBlock, "no threads left"));

        assert_eq!(err.to_string(), "failed to spawn worker thread: no threads left");
        assert_eq!(err.source().unwrap().to_string(), "no threads left");
    }
}
