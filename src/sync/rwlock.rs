use super::monitor::{FairQueue, Monitor, Protocol};
use crate::{
    cancel::CancelToken,
    config::Config,
    error::{Error, Result},
    internal::{Handle, Signal},
    time::Timeout,
};
use std::{fmt, sync::Arc};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Access {
    Read,
    Write,
}

pub(crate) enum Ticket {
    Read(Handle),
    Write(Handle),
}

#[derive(Debug, Default)]
pub(crate) struct Holders {
    writing: bool,
    readers: usize,
    writers: FairQueue<()>,
    waiting_readers: FairQueue<()>,
}

impl Holders {
    /// Admits every waiting reader as one batch.
    fn release_readers(&mut self) -> usize {
        let admitted = self.waiting_readers.complete_all();
        self.readers += admitted;
        admitted
    }

    fn grant_writer(&mut self) -> bool {
        let writing = &mut self.writing;
        self.writers.complete_one(|_| {
            *writing = true;
            true
        })
    }
}

impl Protocol for Holders {
    type Request = Access;
    type Ticket = Ticket;

    fn try_acquire(&mut self, access: &Access) -> bool {
        match access {
            // a queued writer keeps new readers out
            Access::Read if !self.writing && self.writers.is_empty() => {
                self.readers += 1;
                true
            }
            Access::Write if !self.writing && self.readers == 0 && self.writers.is_empty() => {
                self.writing = true;
                true
            }
            _ => false,
        }
    }

    fn enqueue(&mut self, access: Access) -> (Ticket, Arc<Signal>) {
        match access {
            Access::Read => {
                let (handle, signal) = self.waiting_readers.push(());
                (Ticket::Read(handle), signal)
            }
            Access::Write => {
                let (handle, signal) = self.writers.push(());
                (Ticket::Write(handle), signal)
            }
        }
    }

    fn abandon(&mut self, ticket: Ticket) {
        match ticket {
            Ticket::Read(handle) => {
                self.waiting_readers.remove(handle);
            }
            Ticket::Write(handle) => {
                self.writers.remove(handle);
                if !self.writing {
                    if self.writers.is_empty() {
                        self.release_readers();
                    } else if self.readers == 0 {
                        self.grant_writer();
                    }
                }
            }
        }
    }
}

/// A readers-writer lock that favours writers.
///
/// Once a writer is queued, new readers wait behind it. When a writer
/// finishes, every reader that queued up in the meantime is admitted as one
/// batch before the next writer gets a turn; writers are admitted one at a
/// time in FIFO order.
///
/// Unlike `std::sync::RwLock` this lock does not own the data it protects:
/// `start_*` and `end_*` are separate calls, or use [`read`](RwLock::read) /
/// [`write`](RwLock::write) for guards that end the access on drop.
pub struct RwLock {
    monitor: Monitor<Holders>,
}

impl fmt::Debug for RwLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.monitor.lock();
        f.debug_struct("RwLock")
            .field("name", &self.monitor.name())
            .field("writing", &state.writing)
            .field("readers", &state.readers)
            .field("queued_writers", &state.writers.len())
            .field("queued_readers", &state.waiting_readers.len())
            .finish()
    }
}

impl Default for RwLock {
    fn default() -> Self {
        Self::new()
    }
}

impl RwLock {
    pub fn new() -> Self {
        Self::with_config(Config::named("rwlock"))
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            monitor: Monitor::new(Holders::default(), config),
        }
    }

    pub fn start_read(&self, timeout: impl Into<Timeout>) -> Result<bool> {
        self.start_read_with(timeout, &CancelToken::current())
    }

    pub fn start_read_with(&self, timeout: impl Into<Timeout>, token: &CancelToken) -> Result<bool> {
        self.monitor.acquire(Access::Read, timeout.into(), token)
    }

    pub fn start_write(&self, timeout: impl Into<Timeout>) -> Result<bool> {
        self.start_write_with(timeout, &CancelToken::current())
    }

    pub fn start_write_with(&self, timeout: impl Into<Timeout>, token: &CancelToken) -> Result<bool> {
        self.monitor.acquire(Access::Write, timeout.into(), token)
    }

    pub fn end_read(&self) -> Result<()> {
        let mut state = self.monitor.lock();
        if state.readers == 0 {
            return Err(Error::IllegalState("end_read without an active reader"));
        }

        state.readers -= 1;
        if state.readers == 0 && state.grant_writer() {
            tracing::trace!(name = self.monitor.name(), "last reader handed off to writer");
        }
        Ok(())
    }

    pub fn end_write(&self) -> Result<()> {
        let mut state = self.monitor.lock();
        if !state.writing {
            return Err(Error::IllegalState("end_write without an active writer"));
        }

        state.writing = false;
        if !state.waiting_readers.is_empty() {
            let admitted = state.release_readers();
            tracing::trace!(name = self.monitor.name(), admitted, "writer handed off to readers");
        } else if state.grant_writer() {
            tracing::trace!(name = self.monitor.name(), "writer handed off to writer");
        }
        Ok(())
    }

    pub fn read(&self, timeout: impl Into<Timeout>) -> Result<Option<ReadGuard<'_>>> {
        let acquired = self.start_read(timeout)?;
        Ok(acquired.then(|| ReadGuard { lock: self }))
    }

    pub fn write(&self, timeout: impl Into<Timeout>) -> Result<Option<WriteGuard<'_>>> {
        let acquired = self.start_write(timeout)?;
        Ok(acquired.then(|| WriteGuard { lock: self }))
    }

    pub fn reader_count(&self) -> usize {
        self.monitor.lock().readers
    }

    pub fn is_writing(&self) -> bool {
        self.monitor.lock().writing
    }

    pub fn queued_writers(&self) -> usize {
        self.monitor.lock().writers.len()
    }

    pub fn queued_readers(&self) -> usize {
        self.monitor.lock().waiting_readers.len()
    }
}

/// Ends a read access of an [`RwLock`] when dropped.
#[must_use = "dropping the guard ends the read right away"]
#[derive(Debug)]
pub struct ReadGuard<'a> {
    lock: &'a RwLock,
}

impl<'a> Drop for ReadGuard<'a> {
    fn drop(&mut self) {
        let ended = self.lock.end_read();
        debug_assert!(ended.is_ok());
    }
}

/// Ends a write access of an [`RwLock`] when dropped.
#[must_use = "dropping the guard ends the write right away"]
#[derive(Debug)]
pub struct WriteGuard<'a> {
    lock: &'a RwLock,
}

impl<'a> Drop for WriteGuard<'a> {
    fn drop(&mut self) {
        let ended = self.lock.end_write();
        debug_assert!(ended.is_ok());
    }
}
