use thiserror::Error;

/// Failures reported by the blocking primitives.
///
/// A timeout is not an error: it is reported as `Ok(false)`.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// The call was rejected before any state was touched.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The call does not match the primitive's current state,
    /// e.g. ending a read that was never started.
    #[error("illegal state: {0}")]
    IllegalState(&'static str),

    /// The wait was cancelled before the request was granted.
    #[error("wait was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
