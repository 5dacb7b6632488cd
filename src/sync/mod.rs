mod acquire;
mod monitor;

mod batch_event;
mod reset_event;
mod rwlock;
mod semaphore;
mod unary;

pub use self::{
    acquire::Acquire,
    batch_event::BatchedResetEvent,
    reset_event::ManualResetEvent,
    rwlock::{ReadGuard, RwLock, WriteGuard},
    semaphore::{Semaphore, SemaphorePermit},
    unary::{UnarySemaphore, UnarySemaphorePermit},
};
