//! Timer primitives: the inter-attempt delay and the attempt timeout guard.
//!
//! The guard is advisory. An attempt runs as its own tokio task; when the
//! deadline wins the race the guard stops *waiting*, but the task keeps running
//! until it finishes on its own and its result is dropped. Resources held by such
//! an attempt are only released when it completes, because a unit of work offers
//! no way to be interrupted from the outside.
use std::{any::Any, future::Future, time::Duration};

use thiserror::Error;
use tokio::task::JoinError;

/// Why a guarded attempt produced no value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("operation timed out after {millis}ms")]
    Elapsed { millis: u64 },

    #[error("{reason}")]
    Aborted { reason: String },
}

/// Completes after `millis` milliseconds.
pub async fn delay(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

/// Run `fut` as a detached task and wait for it without a deadline.
pub async fn detach<F>(fut: F) -> Result<F::Output, GuardError>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(fut).await.map_err(from_join)
}

/// Race `fut` against a `millis` deadline.
///
/// If the attempt settles first its outcome is returned and the timer is dropped.
/// Otherwise the guard fails with [`GuardError::Elapsed`] after exactly `millis`;
/// the attempt is left running and its eventual result is discarded.
pub async fn guard<F>(fut: F, millis: u64) -> Result<F::Output, GuardError>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let mut handle = tokio::spawn(fut);

    tokio::select! {
        biased;
        joined = &mut handle => joined.map_err(from_join),
        _ = delay(millis) => Err(GuardError::Elapsed { millis }),
    }
}

fn from_join(e: JoinError) -> GuardError {
    if e.is_panic() {
        GuardError::Aborted {
            reason: format!("attempt panicked: {}", panic_message(e.into_panic())),
        }
    } else {
        GuardError::Aborted {
            reason: "attempt task was cancelled by the runtime".into(),
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(s) => *s,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(s) => (*s).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}
