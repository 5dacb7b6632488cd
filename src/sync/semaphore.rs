use super::{
    acquire::Acquire,
    monitor::{FairQueue, Monitor, Protocol},
};
use crate::{
    cancel::CancelToken,
    config::Config,
    error::{Error, Result},
    internal::{Handle, Signal},
    time::Timeout,
};
use std::{fmt, sync::Arc};

#[derive(Debug)]
pub(crate) struct Units {
    available: usize,
    waiters: FairQueue<usize>,
}

impl Units {
    /// Grants queued requests in order for as long as the head fits.
    fn complete(&mut self) -> usize {
        let available = &mut self.available;
        self.waiters.complete_while(|&units| {
            if *available >= units {
                *available -= units;
                true
            } else {
                false
            }
        })
    }
}

impl Protocol for Units {
    type Request = usize;
    type Ticket = Handle;

    fn try_acquire(&mut self, &units: &usize) -> bool {
        // queued requests go first, even if this one would fit
        if self.waiters.is_empty() && self.available >= units {
            self.available -= units;
            true
        } else {
            false
        }
    }

    fn enqueue(&mut self, units: usize) -> (Handle, Arc<Signal>) {
        self.waiters.push(units)
    }

    fn abandon(&mut self, ticket: Handle) {
        // Only the head can be holding back the requests behind it.
        let was_head = self.waiters.is_head(ticket);
        self.waiters.remove(ticket);
        if was_head {
            self.complete();
        }
    }
}

/// A counting semaphore granting requests of any size in FIFO order.
///
/// A request for `n` units is granted only once every request queued before
/// it has been granted or has given up, so a large request is never starved
/// by a stream of small ones.
pub struct Semaphore {
    monitor: Monitor<Units>,
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("name", &self.monitor.name())
            .field("available", &self.available_units())
            .field("queued", &self.queued())
            .finish()
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Semaphore {
    pub fn new(units: usize) -> Self {
        Self::with_config(units, Config::named("semaphore"))
    }

    pub fn with_config(units: usize, config: Config) -> Self {
        let units = Units {
            available: units,
            waiters: FairQueue::default(),
        };
        Self {
            monitor: Monitor::new(units, config),
        }
    }

    /// Acquires `units`, observing the calling thread's [`CancelToken`].
    pub fn acquire(&self, units: usize, timeout: impl Into<Timeout>) -> Result<bool> {
        self.acquire_with(units, timeout, &CancelToken::current())
    }

    pub fn acquire_with(
        &self,
        units: usize,
        timeout: impl Into<Timeout>,
        token: &CancelToken,
    ) -> Result<bool> {
        check_units(units)?;
        self.monitor.acquire(units, timeout.into(), token)
    }

    /// Asynchronous [`acquire`](Self::acquire).
    ///
    /// The returned future takes its place in the same FIFO as blocking
    /// callers the first time it is polled. Dropping it gives up the request,
    /// returning the units if they had already been granted.
    pub fn acquire_async(&self, units: usize, timeout: impl Into<Timeout>) -> Acquire<'_> {
        self.acquire_async_with(units, timeout, &CancelToken::current())
    }

    pub fn acquire_async_with(
        &self,
        units: usize,
        timeout: impl Into<Timeout>,
        token: &CancelToken,
    ) -> Acquire<'_> {
        Acquire::new(self, units, timeout.into(), token.clone())
    }

    pub fn try_acquire(&self, units: usize) -> Result<bool> {
        self.acquire(units, Timeout::NoWait)
    }

    /// Returns `units` to the pool and grants every queued request that now
    /// fits, in order.
    pub fn release(&self, units: usize) -> Result<()> {
        check_units(units)?;

        let mut state = self.monitor.lock();
        state.available = state
            .available
            .checked_add(units)
            .ok_or(Error::InvalidArgument("released units overflow the semaphore"))?;

        let granted = state.complete();
        tracing::trace!(name = self.monitor.name(), units, granted, "released");
        Ok(())
    }

    /// Acquires `units` wrapped in a guard which releases them on drop.
    pub fn permit(
        &self,
        units: usize,
        timeout: impl Into<Timeout>,
    ) -> Result<Option<SemaphorePermit<'_>>> {
        let acquired = self.acquire(units, timeout)?;
        Ok(acquired.then(|| SemaphorePermit {
            semaphore: self,
            units,
        }))
    }

    pub fn available_units(&self) -> usize {
        self.monitor.lock().available
    }

    /// Number of requests currently blocked.
    pub fn queued(&self) -> usize {
        self.monitor.lock().waiters.len()
    }

    #[inline]
    pub(super) fn monitor(&self) -> &Monitor<Units> {
        &self.monitor
    }

    pub(super) fn release_permit(&self, units: usize) {
        let mut state = self.monitor.lock();
        state.available = state.available.saturating_add(units);
        let granted = state.complete();
        tracing::trace!(name = self.monitor.name(), units, granted, "permit dropped");
    }
}

#[inline]
pub(super) fn check_units(units: usize) -> Result<()> {
    if units == 0 {
        return Err(Error::InvalidArgument("unit count must be positive"));
    }
    Ok(())
}

/// Units held from a [`Semaphore`], released when dropped.
#[must_use = "dropping the permit releases its units right away"]
pub struct SemaphorePermit<'a> {
    semaphore: &'a Semaphore,
    units: usize,
}

impl<'a> fmt::Debug for SemaphorePermit<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemaphorePermit")
            .field("units", &self.units)
            .finish()
    }
}

impl<'a> SemaphorePermit<'a> {
    pub fn units(&self) -> usize {
        self.units
    }
}

impl<'a> Drop for SemaphorePermit<'a> {
    fn drop(&mut self) {
        self.semaphore.release_permit(self.units);
    }
}
