mod signal;
mod timer;
mod wait_queue;

pub(crate) use self::{
    signal::Signal,
    timer::Timer,
    wait_queue::{Handle, WaitQueue},
};
