use super::{
    acquire::Acquire,
    semaphore::{Semaphore, SemaphorePermit},
};
use crate::{cancel::CancelToken, config::Config, error::Result, time::Timeout};
use std::fmt;

pub type UnarySemaphorePermit<'a> = SemaphorePermit<'a>;

/// A FIFO semaphore where every request is for exactly one unit.
pub struct UnarySemaphore {
    inner: Semaphore,
}

impl fmt::Debug for UnarySemaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnarySemaphore")
            .field("available", &self.available_units())
            .field("queued", &self.queued())
            .finish()
    }
}

impl UnarySemaphore {
    pub fn new(units: usize) -> Self {
        Self::with_config(units, Config::named("unary-semaphore"))
    }

    pub fn with_config(units: usize, config: Config) -> Self {
        Self {
            inner: Semaphore::with_config(units, config),
        }
    }

    #[inline]
    pub fn acquire(&self, timeout: impl Into<Timeout>) -> Result<bool> {
        self.inner.acquire(1, timeout)
    }

    #[inline]
    pub fn acquire_with(&self, timeout: impl Into<Timeout>, token: &CancelToken) -> Result<bool> {
        self.inner.acquire_with(1, timeout, token)
    }

    pub fn acquire_async(&self, timeout: impl Into<Timeout>) -> Acquire<'_> {
        self.inner.acquire_async(1, timeout)
    }

    pub fn acquire_async_with(
        &self,
        timeout: impl Into<Timeout>,
        token: &CancelToken,
    ) -> Acquire<'_> {
        self.inner.acquire_async_with(1, timeout, token)
    }

    pub fn try_acquire(&self) -> bool {
        matches!(self.inner.try_acquire(1), Ok(true))
    }

    #[inline]
    pub fn release(&self) -> Result<()> {
        self.inner.release(1)
    }

    pub fn permit(&self, timeout: impl Into<Timeout>) -> Result<Option<UnarySemaphorePermit<'_>>> {
        self.inner.permit(1, timeout)
    }

    pub fn available_units(&self) -> usize {
        self.inner.available_units()
    }

    pub fn queued(&self) -> usize {
        self.inner.queued()
    }
}
