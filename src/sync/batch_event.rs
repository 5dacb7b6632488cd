use super::monitor::{Monitor, Protocol};
use crate::{cancel::CancelToken, config::Config, error::Result, internal::Signal, time::Timeout};
use std::{fmt, sync::Arc};

#[derive(Debug)]
pub(crate) struct Batch {
    is_set: bool,
    current: Arc<Signal>,
}

impl Protocol for Batch {
    type Request = ();
    type Ticket = ();

    fn try_acquire(&mut self, _: &()) -> bool {
        self.is_set
    }

    fn enqueue(&mut self, _: ()) -> ((), Arc<Signal>) {
        ((), self.current.clone())
    }

    /// The batch belongs to every waiter of this reset interval, so a single
    /// waiter leaving has nothing to unlink.
    fn abandon(&mut self, _: ()) {}
}

/// A manual-reset event releasing its waiters as one batch.
///
/// All threads that start waiting between a `reset` and the following `set`
/// share one completion signal, so `set` wakes any number of them in O(1).
/// `reset` starts a fresh batch, which keeps waiters from an earlier cycle
/// from being satisfied by a later `set`.
///
/// The trade-off against [`ManualResetEvent`](super::ManualResetEvent) is
/// that individual waiters cannot be unlinked: giving up (timeout or
/// cancellation) just leaves the wait loop.
pub struct BatchedResetEvent {
    monitor: Monitor<Batch>,
}

impl fmt::Debug for BatchedResetEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchedResetEvent")
            .field("name", &self.monitor.name())
            .field("is_set", &self.is_set())
            .finish()
    }
}

impl Default for BatchedResetEvent {
    fn default() -> Self {
        Self::new(false)
    }
}

impl BatchedResetEvent {
    pub fn new(is_set: bool) -> Self {
        Self::with_config(is_set, Config::named("batched-reset-event"))
    }

    pub fn with_config(is_set: bool, config: Config) -> Self {
        let batch = Batch {
            is_set,
            current: Signal::new(),
        };
        Self {
            monitor: Monitor::new(batch, config),
        }
    }

    pub fn is_set(&self) -> bool {
        self.monitor.lock().is_set
    }

    pub fn set(&self) {
        let mut state = self.monitor.lock();
        if state.is_set {
            return;
        }

        state.is_set = true;
        state.current.fulfil();
        tracing::trace!(name = self.monitor.name(), "batch released");
    }

    pub fn reset(&self) {
        let mut state = self.monitor.lock();
        if !state.is_set {
            return;
        }

        state.is_set = false;
        state.current = Signal::new();
    }

    pub fn wait(&self, timeout: impl Into<Timeout>) -> Result<bool> {
        self.wait_with(timeout, &CancelToken::current())
    }

    pub fn wait_with(&self, timeout: impl Into<Timeout>, token: &CancelToken) -> Result<bool> {
        self.monitor.acquire((), timeout.into(), token)
    }
}
