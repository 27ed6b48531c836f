use std::fmt;

use crate::error::Failure;

/// Outcome of a single attempt, borrowed for inspection by hooks.
pub enum Outcome<'a, T, E> {
    /// The work produced a value.
    Success(&'a T),
    /// The work failed, timed out or panicked.
    Failure(&'a Failure<E>),
    /// The work returned the cancellation sentinel.
    Canceled,
}

impl<'a, T, E> Outcome<'a, T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Outcome::Canceled)
    }

    /// The produced value, if the attempt succeeded.
    pub fn value(&self) -> Option<&'a T> {
        match *self {
            Outcome::Success(v) => Some(v),
            _ => None,
        }
    }

    /// The recorded failure, if the attempt failed.
    pub fn failure(&self) -> Option<&'a Failure<E>> {
        match *self {
            Outcome::Failure(f) => Some(f),
            _ => None,
        }
    }
}

impl<T, E> Clone for Outcome<'_, T, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, E> Copy for Outcome<'_, T, E> {}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Outcome<'_, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success(v) => f.debug_tuple("Success").field(v).finish(),
            Outcome::Failure(e) => f.debug_tuple("Failure").field(e).finish(),
            Outcome::Canceled => f.write_str("Canceled"),
        }
    }
}

/// Report passed to the progress hook after every attempt.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a, T, E> {
    /// Name of the poller that made the attempt.
    pub poller: &'a str,
    /// 0-based index of the attempt.
    pub attempt: u32,
    /// Retry budget left after this attempt was made.
    pub retries_remaining: u32,
    /// What the attempt produced.
    pub outcome: Outcome<'a, T, E>,
}
