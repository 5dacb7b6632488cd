use super::Duration;

/// The wait budget handed to a blocking operation.
///
/// Finite budgets are measured from the moment the operation is entered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// Try once and never block.
    NoWait,
    /// Block for at most the given duration.
    After(Duration),
    /// Block until granted or cancelled.
    Infinite,
}

impl Default for Timeout {
    fn default() -> Self {
        Self::Infinite
    }
}

impl Timeout {
    pub const fn from_millis(millis: u64) -> Self {
        Self::After(Duration::from_millis(millis))
    }

    /// Whether the operation should give up instead of blocking.
    ///
    /// A zero duration behaves exactly like [`Timeout::NoWait`].
    #[inline]
    pub fn is_no_wait(&self) -> bool {
        match self {
            Self::NoWait => true,
            Self::After(duration) => duration.is_zero(),
            Self::Infinite => false,
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            Self::NoWait
        } else {
            Self::After(duration)
        }
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(duration: Option<Duration>) -> Self {
        duration.map(Self::from).unwrap_or(Self::Infinite)
    }
}
