mod deadline;
mod timeouts;

pub use deadline::Deadline;
pub use std::time::{Duration, Instant};
pub use timeouts::Timeout;
