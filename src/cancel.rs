//! Cancellation of blocked waiters.
//!
//! Threads cannot be interrupted from the outside, so every blocking
//! operation observes a [`CancelToken`] instead. Each thread has an ambient
//! token returned by [`CancelToken::current`] which the plain operations
//! (`acquire`, `start_read`, `wait`, ...) use; the `*_with` variants take an
//! explicit token that may be shared between many waiters.
//!
//! A cancelled token stays cancelled until [`CancelToken::reset`] is called.
//! In particular, when a waiter is granted concurrently with its cancellation
//! the operation reports success and leaves the token cancelled, so the
//! caller can still notice it.

use crate::internal::{Handle, Signal, WaitQueue};
use parking_lot::Mutex;
use std::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
    sync::Arc,
};

thread_local! {
    static CURRENT: CancelToken = CancelToken::new();
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    waiters: Mutex<WaitQueue<Arc<Signal>>>,
}

/// A cloneable cancellation flag that wakes the waiters observing it.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// The calling thread's ambient token.
    ///
    /// Hand a clone of it to another thread to let that thread cancel
    /// whatever this one is blocked on.
    pub fn current() -> Self {
        CURRENT.with(Clone::clone)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Cancels the token and wakes every waiter currently observing it.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }

        let waiters = self.inner.waiters.lock();
        tracing::trace!(waiters = waiters.len(), "cancel token fired");
        waiters.iter().for_each(|signal| signal.wake());
    }

    /// Clears the cancellation, returning whether it was set.
    pub fn reset(&self) -> bool {
        self.inner.cancelled.swap(false, Ordering::AcqRel)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Keeps `signal` woken on cancellation until the registration drops.
    pub(crate) fn register(&self, signal: &Arc<Signal>) -> Registration {
        let handle = self.inner.waiters.lock().push_back(signal.clone());
        Registration {
            token: self.clone(),
            handle,
        }
    }
}

pub(crate) struct Registration {
    token: CancelToken,
    handle: Handle,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let removed = self.token.inner.waiters.lock().remove(self.handle);
        debug_assert!(removed.is_some());
    }
}
