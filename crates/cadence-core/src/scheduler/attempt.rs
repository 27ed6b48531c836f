use tracing::trace;

use cadence_model::TimeoutMs;

use crate::{
    error::{Failure, TaskError},
    time::{GuardError, detach, guard},
    work::BoxAttempt,
};

/// Why an attempt did not produce a value.
pub(crate) enum AttemptError<E> {
    Failed(Failure<E>),
    Canceled,
}

/// Run one attempt as its own task, guarded by `timeout` when set.
pub(crate) async fn execute<T, E>(
    attempt: BoxAttempt<T, E>,
    timeout: Option<TimeoutMs>,
) -> Result<T, AttemptError<E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    let joined = match timeout {
        Some(ms) => guard(attempt, ms).await,
        None => detach(attempt).await,
    };

    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(TaskError::Fail(e))) => Err(AttemptError::Failed(Failure::Error(e))),
        Ok(Err(TaskError::Canceled)) => Err(AttemptError::Canceled),
        Err(GuardError::Elapsed { millis }) => {
            trace!(timeout_ms = millis, "attempt timed out");
            Err(AttemptError::Failed(Failure::Timeout { timeout_ms: millis }))
        }
        Err(GuardError::Aborted { reason }) => {
            Err(AttemptError::Failed(Failure::Aborted { reason }))
        }
    }
}
