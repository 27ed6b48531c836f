use thiserror::Error;

use cadence_model::{ModelError, TimeoutMs};

/// Construction-time errors, surfaced before any attempt runs.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid strategy \"{name}\"; valid strategies are {valid}")]
    UnknownStrategy { name: String, valid: String },

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("poller is already polling")]
    AlreadyPolling,
}

/// Error returned by a unit of work.
///
/// `Canceled` is the cancellation sentinel: returning it stops the whole run
/// immediately, regardless of the remaining retry budget.
#[derive(Debug, Error)]
pub enum TaskError<E> {
    #[error("attempt failed: {0}")]
    Fail(E),

    #[error("attempt canceled")]
    Canceled,
}

impl<E> TaskError<E> {
    /// Wrap an ordinary failure.
    pub fn fail(err: E) -> Self {
        TaskError::Fail(err)
    }

    /// Returns `true` for the cancellation sentinel.
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }
}

/// One recorded per-attempt failure.
#[derive(Debug, Error)]
pub enum Failure<E> {
    #[error("{0}")]
    Error(E),

    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: TimeoutMs },

    #[error("attempt aborted: {reason}")]
    Aborted { reason: String },
}

impl<E> Failure<E> {
    /// The work function's own error, if this failure carries one.
    pub fn as_error(&self) -> Option<&E> {
        match self {
            Failure::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Returns `true` if the attempt exceeded its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Failure::Timeout { .. })
    }
}

/// Terminal outcome of a failed run.
///
/// Every variant that ends a run after one or more failed attempts carries
/// the full ordered failure history, not just the last error.
#[derive(Debug, Error)]
pub enum PollError<E> {
    #[error("master timeout reached after {timeout_ms}ms")]
    MasterTimeout { timeout_ms: TimeoutMs },

    #[error("polling canceled after {} failed attempt(s)", .failures.len())]
    Canceled { failures: Vec<Failure<E>> },

    #[error("retries exhausted after {attempts} attempt(s)")]
    RetriesExhausted {
        attempts: u32,
        failures: Vec<Failure<E>>,
    },

    #[error("polling stopped by predicate after {} failed attempt(s)", .failures.len())]
    Declined { failures: Vec<Failure<E>> },

    #[error("poller dropped before it settled")]
    Abandoned,
}

impl<E> PollError<E> {
    /// Ordered per-attempt failures accumulated before the run ended.
    pub fn failures(&self) -> &[Failure<E>] {
        match self {
            PollError::Canceled { failures }
            | PollError::RetriesExhausted { failures, .. }
            | PollError::Declined { failures } => failures,
            PollError::MasterTimeout { .. } | PollError::Abandoned => &[],
        }
    }

    /// Consume the error and return its failure history.
    pub fn into_failures(self) -> Vec<Failure<E>> {
        match self {
            PollError::Canceled { failures }
            | PollError::RetriesExhausted { failures, .. }
            | PollError::Declined { failures } => failures,
            PollError::MasterTimeout { .. } | PollError::Abandoned => Vec::new(),
        }
    }

    pub fn is_master_timeout(&self) -> bool {
        matches!(self, PollError::MasterTimeout { .. })
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, PollError::Canceled { .. })
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_are_exposed_in_order() {
        let err: PollError<&str> = PollError::RetriesExhausted {
            attempts: 3,
            failures: vec![
                Failure::Error("a"),
                Failure::Timeout { timeout_ms: 10 },
                Failure::Error("c"),
            ],
        };

        let f = err.failures();
        assert_eq!(f.len(), 3);
        assert_eq!(f[0].as_error(), Some(&"a"));
        assert!(f[1].is_timeout());
        assert_eq!(err.to_string(), "retries exhausted after 3 attempt(s)");
    }

    #[test]
    fn terminal_errors_without_history_have_no_failures() {
        let err: PollError<String> = PollError::MasterTimeout { timeout_ms: 50 };
        assert!(err.failures().is_empty());
        assert!(err.is_master_timeout());
        assert_eq!(err.to_string(), "master timeout reached after 50ms");
        assert!(err.into_failures().is_empty());
    }

    #[test]
    fn timeout_failure_message_is_stable() {
        let f: Failure<String> = Failure::Timeout { timeout_ms: 25 };
        assert_eq!(f.to_string(), "operation timed out after 25ms");
    }

    #[test]
    fn model_error_converts() {
        let err: CoreError = ModelError::Invalid("x".into()).into();
        assert!(matches!(err, CoreError::Model(_)));
    }
}
