use crate::{cancel::CancelToken, time::Deadline};
use parking_lot::{Condvar, Mutex};
use std::{fmt, sync::Arc, task::Waker};

/// Completion half of a queued request.
///
/// A `Signal` starts out unfulfilled. The thread that grants the request calls
/// [`fulfil`](Signal::fulfil) exactly once while holding the owning
/// primitive's monitor; the waiter blocks in [`wait`](Signal::wait) with the
/// monitor released and re-validates [`is_fulfilled`](Signal::is_fulfilled)
/// after re-acquiring it.
///
/// Asynchronous waiters park a [`Waker`] instead of blocking; it is woken
/// alongside the condvar.
///
/// One signal is created per request, or per batch for primitives that release
/// whole groups at once. They are never recycled.
pub(crate) struct Signal {
    state: Mutex<State>,
    cond: Condvar,
}

#[derive(Default)]
struct State {
    fulfilled: bool,
    waker: Option<Waker>,
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("fulfilled", &self.is_fulfilled())
            .finish()
    }
}

impl Signal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State::default()),
            cond: Condvar::new(),
        })
    }

    #[inline]
    pub fn is_fulfilled(&self) -> bool {
        self.state.lock().fulfilled
    }

    /// Marks the request as granted and wakes everyone blocked on it.
    ///
    /// Returns false if the signal was already fulfilled.
    pub fn fulfil(&self) -> bool {
        let mut state = self.state.lock();
        if state.fulfilled {
            return false;
        }

        state.fulfilled = true;
        self.cond.notify_all();
        let waker = state.waker.take();
        drop(state);

        if let Some(waker) = waker {
            waker.wake();
        }
        true
    }

    /// Wakes the waiters without fulfilling, so they re-check their token
    /// or deadline.
    ///
    /// Taking the lock orders this after any waiter that is between checking
    /// its token and parking on the condvar.
    pub fn wake(&self) {
        let mut state = self.state.lock();
        self.cond.notify_all();
        let waker = state.waker.take();
        drop(state);

        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Stores the waker of the task polling this request, replacing the one
    /// from an earlier poll.
    ///
    /// Callers must re-check their wake conditions after this returns.
    pub fn register_waker(&self, waker: &Waker) {
        let mut state = self.state.lock();
        match &state.waker {
            Some(current) if current.will_wake(waker) => {}
            _ => state.waker = Some(waker.clone()),
        }
    }

    /// Blocks until the signal is fulfilled, `token` is cancelled or the
    /// deadline passes. The caller re-validates which one happened.
    pub fn wait(&self, deadline: Deadline, token: &CancelToken) {
        let mut state = self.state.lock();
        while !state.fulfilled && !token.is_cancelled() {
            match deadline.instant() {
                None => self.cond.wait(&mut state),
                Some(instant) => {
                    if self.cond.wait_until(&mut state, instant).timed_out() {
                        return;
                    }
                }
            }
        }
    }
}
