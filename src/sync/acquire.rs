use super::{
    monitor::Protocol,
    semaphore::{check_units, Semaphore},
};
use crate::{
    cancel::{CancelToken, Registration},
    error::{Error, Result},
    internal::{Handle, Signal, Timer},
    time::{Deadline, Timeout},
};
use futures_core::future::FusedFuture;
use std::{
    fmt,
    future::Future,
    mem,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

enum Stage {
    Start,
    Queued {
        ticket: Handle,
        signal: Arc<Signal>,
        _registration: Registration,
    },
    Done,
}

/// Future returned by [`Semaphore::acquire_async`].
///
/// Resolves like the blocking `acquire`: `Ok(true)` once granted, `Ok(false)`
/// when the timeout passes first and `Err(Error::Cancelled)` when its token
/// is cancelled first. The timeout is measured from the call that created
/// the future.
#[must_use = "futures do nothing unless polled"]
pub struct Acquire<'a> {
    semaphore: &'a Semaphore,
    units: usize,
    timeout: Timeout,
    deadline: Deadline,
    token: CancelToken,
    stage: Stage,
}

impl<'a> fmt::Debug for Acquire<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.stage {
            Stage::Start => "start",
            Stage::Queued { .. } => "queued",
            Stage::Done => "done",
        };
        f.debug_struct("Acquire")
            .field("units", &self.units)
            .field("timeout", &self.timeout)
            .field("stage", &stage)
            .finish()
    }
}

impl<'a> Acquire<'a> {
    pub(super) fn new(
        semaphore: &'a Semaphore,
        units: usize,
        timeout: Timeout,
        token: CancelToken,
    ) -> Self {
        Self {
            semaphore,
            units,
            timeout,
            deadline: Deadline::start(timeout),
            token,
            stage: Stage::Start,
        }
    }
}

impl<'a> Future for Acquire<'a> {
    type Output = Result<bool>;

    fn poll(self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let monitor = this.semaphore.monitor();

        let (ticket, signal, registration) = match mem::replace(&mut this.stage, Stage::Done) {
            Stage::Done => {
                return Poll::Ready(Err(Error::IllegalState("acquire polled after completion")))
            }
            Stage::Start => {
                check_units(this.units)?;

                let mut state = monitor.lock();
                if state.try_acquire(&this.units) {
                    return Poll::Ready(Ok(true));
                }
                if this.timeout.is_no_wait() {
                    return Poll::Ready(Ok(false));
                }

                let (ticket, signal) = state.enqueue(this.units);
                let registration = this.token.register(&signal);
                if let Some(deadline) = this.deadline.instant() {
                    match Timer::global() {
                        Some(timer) => timer.schedule(deadline, &signal),
                        None => tracing::warn!(
                            name = monitor.name(),
                            "no timer thread, timeout only observed when polled"
                        ),
                    }
                }
                tracing::trace!(name = monitor.name(), timeout = ?this.timeout, "waiting async");
                (ticket, signal, registration)
            }
            Stage::Queued {
                ticket,
                signal,
                _registration,
            } => (ticket, signal, _registration),
        };

        // Store the waker before looking at the outcome so a grant, a
        // cancellation or the timer firing in between still wakes this task.
        signal.register_waker(ctx.waker());

        let mut state = monitor.lock();
        if signal.is_fulfilled() {
            return Poll::Ready(Ok(true));
        }

        if this.token.is_cancelled() {
            state.abandon(ticket);
            tracing::debug!(name = monitor.name(), "cancelled while waiting async");
            return Poll::Ready(Err(Error::Cancelled));
        }

        if this.deadline.has_expired() {
            state.abandon(ticket);
            tracing::debug!(name = monitor.name(), timeout = ?this.timeout, "timed out async");
            return Poll::Ready(Ok(false));
        }

        this.stage = Stage::Queued {
            ticket,
            signal,
            _registration: registration,
        };
        Poll::Pending
    }
}

impl<'a> FusedFuture for Acquire<'a> {
    fn is_terminated(&self) -> bool {
        matches!(self.stage, Stage::Done)
    }
}

impl<'a> Drop for Acquire<'a> {
    fn drop(&mut self) {
        if let Stage::Queued { ticket, signal, .. } = mem::replace(&mut self.stage, Stage::Done) {
            let mut state = self.semaphore.monitor().lock();
            if !signal.is_fulfilled() {
                state.abandon(ticket);
                return;
            }

            // granted, but nobody will ever see it
            drop(state);
            self.semaphore.release_permit(self.units);
        }
    }
}
