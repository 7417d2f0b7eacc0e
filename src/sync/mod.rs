//! Synchronization utilities.

use std::fmt;

pub mod blocking;
pub mod cancel;

pub use self::cancel::CancellationToken;

/// An error returned when a queue is created with a capacity of zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InvalidCapacity;

impl fmt::Display for InvalidCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "queue capacity must be greater than zero".fmt(f)
    }
}

impl std::error::Error for InvalidCapacity {}

/// An error that may be emitted when attempting to put a value on a queue
/// without waiting.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum TryPutError<T> {
    /// The queue was full when the put was attempted.
    Full(T),
}

impl<T> TryPutError<T> {
    /// Consume the error and return the value that wasn't inserted.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(value) => value,
        }
    }
}

impl<T> fmt::Debug for TryPutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TryPutError::Full(..) => f.write_str("Full(..)"),
        }
    }
}

impl<T> fmt::Display for TryPutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryPutError::Full(..) => "putting on a full queue".fmt(f),
        }
    }
}

impl<T> std::error::Error for TryPutError<T> {}

/// An error that may be emitted by a put that waits for a free slot.
///
/// The value is handed back, so a failed put never loses it.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum PutError<T> {
    /// No slot became free before the timeout elapsed.
    Timeout(T),
    /// The wait was cancelled through a [`CancellationToken`].
    Cancelled(T),
}

impl<T> PutError<T> {
    /// Consume the error and return the value that wasn't inserted.
    pub fn into_inner(self) -> T {
        match self {
            Self::Timeout(value) | Self::Cancelled(value) => value,
        }
    }

    /// Returns true if the put was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(..))
    }

    /// Returns true if the put timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(..))
    }
}

impl<T> fmt::Debug for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PutError::Timeout(..) => f.write_str("Timeout(..)"),
            PutError::Cancelled(..) => f.write_str("Cancelled(..)"),
        }
    }
}

impl<T> fmt::Display for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PutError::Timeout(..) => "timed out waiting to put on a full queue".fmt(f),
            PutError::Cancelled(..) => "cancelled while waiting to put on a full queue".fmt(f),
        }
    }
}

impl<T> std::error::Error for PutError<T> {}

/// An error that may be emitted when attempting to take a value from a queue
/// without waiting.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TryTakeError {
    /// The queue was empty when the take was attempted.
    Empty,
}

impl fmt::Display for TryTakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryTakeError::Empty => "taking from an empty queue".fmt(f),
        }
    }
}

impl std::error::Error for TryTakeError {}

/// An error that may be emitted by a take that waits for a value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TakeError {
    /// No value arrived before the timeout elapsed.
    Timeout,
    /// The wait was cancelled through a [`CancellationToken`].
    Cancelled,
}

impl fmt::Display for TakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TakeError::Timeout => "timed out waiting to take from an empty queue".fmt(f),
            TakeError::Cancelled => "cancelled while waiting to take from an empty queue".fmt(f),
        }
    }
}

impl std::error::Error for TakeError {}
