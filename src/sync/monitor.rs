use crate::{
    cancel::CancelToken,
    config::Config,
    error::{Error, Result},
    internal::{Handle, Signal, WaitQueue},
    time::{Deadline, Timeout},
};
use parking_lot::{Mutex, MutexGuard};
use std::{fmt, sync::Arc};

/// The policy half of a blocking primitive: its protected state and how
/// requests are admitted, queued and withdrawn.
///
/// All methods run with the primitive's monitor held.
pub(crate) trait Protocol {
    type Request;
    type Ticket;

    /// Fast path. Grants `request` right away if the policy allows it,
    /// updating the state as a side effect.
    fn try_acquire(&mut self, request: &Self::Request) -> bool;

    /// Queues `request`, returning how to find it again and the signal the
    /// waiter blocks on.
    fn enqueue(&mut self, request: Self::Request) -> (Self::Ticket, Arc<Signal>);

    /// The waiter behind `ticket` gives up. Unlinks it and grants whoever
    /// its departure unblocked.
    fn abandon(&mut self, ticket: Self::Ticket);
}

/// A mutex around a [`Protocol`] implementing the shared wait discipline.
pub(crate) struct Monitor<P> {
    state: Mutex<P>,
    config: Config,
}

impl<P: Protocol> Monitor<P> {
    pub fn new(state: P, config: Config) -> Self {
        Self {
            state: Mutex::new(state),
            config,
        }
    }

    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, P> {
        self.state.lock()
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Acquires `request`, blocking for at most `timeout`.
    ///
    /// Returns `Ok(true)` once granted and `Ok(false)` if the deadline passes
    /// first. A cancellation of `token` before the grant withdraws the request
    /// and returns [`Error::Cancelled`]; one that races with the grant loses
    /// and leaves the token cancelled.
    pub fn acquire(
        &self,
        request: P::Request,
        timeout: Timeout,
        token: &CancelToken,
    ) -> Result<bool> {
        let deadline = Deadline::start(timeout);
        let mut state = self.state.lock();
        if state.try_acquire(&request) {
            return Ok(true);
        }

        if timeout.is_no_wait() {
            return Ok(false);
        }

        let (ticket, signal) = state.enqueue(request);
        let _registration = token.register(&signal);
        tracing::trace!(name = self.name(), ?timeout, "waiting");

        loop {
            MutexGuard::unlocked(&mut state, || {
                (self.config.on_park)();
                signal.wait(deadline, token);
                (self.config.on_unpark)();
            });

            // A grant always wins: whoever fulfilled the signal already
            // updated the state on our behalf.
            if signal.is_fulfilled() {
                if token.is_cancelled() {
                    tracing::debug!(name = self.name(), "granted despite cancellation");
                }
                return Ok(true);
            }

            if token.is_cancelled() {
                state.abandon(ticket);
                tracing::debug!(name = self.name(), "cancelled while waiting");
                return Err(Error::Cancelled);
            }

            if deadline.has_expired() {
                state.abandon(ticket);
                tracing::debug!(name = self.name(), ?timeout, "timed out");
                return Ok(false);
            }
        }
    }
}

struct Waiter<R> {
    request: R,
    signal: Arc<Signal>,
}

impl<R: fmt::Debug> fmt::Debug for Waiter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.request.fmt(f)
    }
}

/// FIFO of pending requests, each with its own [`Signal`].
pub(crate) struct FairQueue<R> {
    waiters: WaitQueue<Waiter<R>>,
}

impl<R> Default for FairQueue<R> {
    fn default() -> Self {
        Self {
            waiters: WaitQueue::new(),
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for FairQueue<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.waiters.fmt(f)
    }
}

impl<R> FairQueue<R> {
    #[inline]
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    pub fn push(&mut self, request: R) -> (Handle, Arc<Signal>) {
        let signal = Signal::new();
        let handle = self.waiters.push_back(Waiter {
            request,
            signal: signal.clone(),
        });
        (handle, signal)
    }

    #[inline]
    pub fn is_head(&self, handle: Handle) -> bool {
        self.waiters.is_head(handle)
    }

    pub fn remove(&mut self, handle: Handle) -> Option<R> {
        self.waiters.remove(handle).map(|waiter| waiter.request)
    }

    /// Kernel-style completion: while the head request is accepted by
    /// `grant`, pops it and fulfils its signal. `grant` performs the state
    /// update for the request it accepts. Returns how many were completed.
    pub fn complete_while(&mut self, mut grant: impl FnMut(&R) -> bool) -> usize {
        let mut completed = 0;
        while let Some(waiter) = self.waiters.front() {
            if !grant(&waiter.request) {
                break;
            }

            if let Some(waiter) = self.waiters.pop_front() {
                waiter.signal.fulfil();
                completed += 1;
            }
        }
        completed
    }

    /// Like [`complete_while`](Self::complete_while) but stops after the
    /// first grant.
    pub fn complete_one(&mut self, grant: impl FnOnce(&R) -> bool) -> bool {
        let mut grant = Some(grant);
        self.complete_while(|request| grant.take().map_or(false, |grant| grant(request))) == 1
    }

    pub fn complete_all(&mut self) -> usize {
        self.complete_while(|_| true)
    }
}
