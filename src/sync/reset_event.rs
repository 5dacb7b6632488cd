use super::monitor::{FairQueue, Monitor, Protocol};
use crate::{
    cancel::CancelToken,
    config::Config,
    error::Result,
    internal::{Handle, Signal},
    time::Timeout,
};
use std::{fmt, sync::Arc};

#[derive(Debug, Default)]
pub(crate) struct Latch {
    is_set: bool,
    waiters: FairQueue<()>,
}

impl Protocol for Latch {
    type Request = ();
    type Ticket = Handle;

    fn try_acquire(&mut self, _: &()) -> bool {
        self.is_set
    }

    fn enqueue(&mut self, request: ()) -> (Handle, Arc<Signal>) {
        self.waiters.push(request)
    }

    fn abandon(&mut self, ticket: Handle) {
        self.waiters.remove(ticket);
    }
}

/// An event that stays set until it is explicitly reset.
///
/// Every waiter keeps its own entry in the queue: [`set`](Self::set)
/// completes each of them individually, and a waiter that gives up removes
/// only itself.
pub struct ManualResetEvent {
    monitor: Monitor<Latch>,
}

impl fmt::Debug for ManualResetEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.monitor.lock();
        f.debug_struct("ManualResetEvent")
            .field("name", &self.monitor.name())
            .field("is_set", &state.is_set)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

impl Default for ManualResetEvent {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ManualResetEvent {
    pub fn new(is_set: bool) -> Self {
        Self::with_config(is_set, Config::named("manual-reset-event"))
    }

    pub fn with_config(is_set: bool, config: Config) -> Self {
        let latch = Latch {
            is_set,
            waiters: FairQueue::default(),
        };
        Self {
            monitor: Monitor::new(latch, config),
        }
    }

    pub fn is_set(&self) -> bool {
        self.monitor.lock().is_set
    }

    /// Sets the event, completing every waiter currently queued.
    pub fn set(&self) {
        let mut state = self.monitor.lock();
        state.is_set = true;

        let released = state.waiters.complete_all();
        if released > 0 {
            tracing::trace!(name = self.monitor.name(), released, "event set");
        }
    }

    /// Only affects waits that start after this call.
    pub fn reset(&self) {
        self.monitor.lock().is_set = false;
    }

    pub fn wait(&self, timeout: impl Into<Timeout>) -> Result<bool> {
        self.wait_with(timeout, &CancelToken::current())
    }

    pub fn wait_with(&self, timeout: impl Into<Timeout>, token: &CancelToken) -> Result<bool> {
        self.monitor.acquire((), timeout.into(), token)
    }

    pub fn waiters(&self) -> usize {
        self.monitor.lock().waiters.len()
    }
}
