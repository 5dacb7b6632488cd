//! Fair, cancellable blocking synchronizers.
//!
//! Every primitive in this crate is a monitor: one [`parking_lot::Mutex`]
//! guarding explicit state plus an ordered queue of pending requests. The
//! thread that changes the state (a release, a `set`, an `end_write`) decides
//! which waiters it satisfied, marks them fulfilled and wakes them. A woken
//! waiter never competes for the resource again; it only checks whether its
//! own request was fulfilled.
//!
//! - [`Semaphore`] / [`UnarySemaphore`]: FIFO counting semaphores, with an
//!   [`Acquire`] future for asynchronous callers sharing the same queue.
//! - [`RwLock`]: readers-writer lock where queued writers block new readers.
//! - [`ManualResetEvent`] / [`BatchedResetEvent`]: manual-reset events.
//!
//! Blocking operations take a [`Timeout`] and observe a [`CancelToken`],
//! returning `Ok(true)` when granted, `Ok(false)` on timeout and
//! `Err(Error::Cancelled)` when cancelled before the grant.

#![forbid(unsafe_code)]

pub mod cancel;
pub mod config;
pub mod error;
pub mod sync;
pub mod time;

mod internal;

pub use self::{
    cancel::CancelToken,
    config::{Config, ConfigBuilder},
    error::{Error, Result},
    sync::{
        Acquire, BatchedResetEvent, ManualResetEvent, ReadGuard, RwLock, Semaphore,
        SemaphorePermit, UnarySemaphore, UnarySemaphorePermit, WriteGuard,
    },
    time::{Deadline, Timeout},
};
