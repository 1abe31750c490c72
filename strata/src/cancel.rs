use crate::utils::Slab;

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Callback run once when a token is cancelled.
type Listener = Box<dyn FnOnce() + Send>;

/// A shared cancellation flag.
///
/// Threads cannot be interrupted from the outside, so a blocked call is
/// given a `CancelToken` instead. Cancelling the token wakes every call
/// currently blocked on it; those calls return
/// [`Error::Interrupted`](crate::Error::Interrupted) while the pool and
/// any other caller carry on untouched.
///
/// Clones share the same flag. Cancellation is permanent.
///
/// # Examples
///
/// ```rust,ignore
/// let token = CancelToken::new();
/// let watcher = token.clone();
///
/// std::thread::spawn(move || watcher.cancel());
/// let result = pool.try_map_cancellable(&token, items, work);
/// ```
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Set once, never cleared.
    cancelled: AtomicBool,

    /// Wake-ups registered by blocked callers.
    listeners: Mutex<Slab<Listener>>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and wakes every call blocked on it.
    ///
    /// Calling this more than once has no further effect.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }

        // Taken under the lock: no listener can be registered afterwards.
        let listeners: Vec<Listener> = self.inner.listeners.lock().drain().collect();

        log::debug!("cancel token fired, waking {} waiter(s)", listeners.len());

        for listener in listeners {
            listener();
        }
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Registers `listener` to run when the token is cancelled.
    ///
    /// Nothing is registered if the token is already cancelled; callers
    /// check [`is_cancelled`](Self::is_cancelled) under their own lock
    /// before blocking. The listener is unregistered when the returned
    /// guard is dropped.
    pub(crate) fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: FnOnce() + Send + 'static,
    {
        let mut listeners = self.inner.listeners.lock();

        let key = if self.is_cancelled() {
            None
        } else {
            let key = listeners.insert(Box::new(listener));
            log::trace!("cancel listener {key} registered, {} active", listeners.len());
            Some(key)
        };

        Subscription {
            inner: self.inner.clone(),
            key,
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Keeps a listener registered on a [`CancelToken`].
pub(crate) struct Subscription {
    inner: Arc<Inner>,
    key: Option<usize>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.inner.listeners.lock().remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_clones_share_the_flag() {
        let token = CancelToken::new();
        let clone = token.clone();

        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_listeners_fire_once() {
        let token = CancelToken::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        let _guard = token.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        token.cancel();
        token.cancel();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_subscription_is_not_called() {
        let token = CancelToken::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        drop(token.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        token.cancel();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(token.inner.listeners.lock().len(), 0);
    }

    #[test]
    fn test_subscribing_after_cancel_registers_nothing() {
        let token = CancelToken::new();
        token.cancel();

        let guard = token.subscribe(|| unreachable!("token already cancelled"));

        assert!(guard.key.is_none());
        assert_eq!(token.inner.listeners.lock().len(), 0);
    }
}
