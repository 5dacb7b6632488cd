use super::{Duration, Instant, Timeout};

/// An absolute point in time a waiter gives up at.
///
/// Computed once from a [`Timeout`] when the wait starts; every later
/// `remaining`/`has_expired` check is made against that same instant.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Deadline {
    At(Instant),
    Never,
}

impl Deadline {
    pub fn start(timeout: Timeout) -> Self {
        match timeout {
            Timeout::NoWait => Self::At(Instant::now()),
            Timeout::After(duration) => Instant::now()
                .checked_add(duration)
                .map(Self::At)
                .unwrap_or(Self::Never),
            Timeout::Infinite => Self::Never,
        }
    }

    #[inline]
    pub fn instant(&self) -> Option<Instant> {
        match *self {
            Self::At(instant) => Some(instant),
            Self::Never => None,
        }
    }

    /// Time left before the deadline, `None` when it never expires.
    pub fn remaining(&self) -> Option<Duration> {
        self.instant()
            .map(|instant| instant.saturating_duration_since(Instant::now()))
    }

    #[inline]
    pub fn has_expired(&self) -> bool {
        self.remaining().map_or(false, |remaining| remaining.is_zero())
    }
}
