//! Progress hook that turns every attempt into a structured tracing event.
//!
//! ```rust,ignore
//! let config = PollConfig::<u32, String>::builder()
//!     .on_progress(cadence_observe::progress::log_progress)
//!     .build()?;
//! ```
use std::fmt;

use cadence_core::{Failure, Outcome, Progress};
use tracing::{error, info, trace, warn};

/// Log one attempt report.
///
/// Success logs at trace, failure and timeout at warn, an aborted attempt at
/// error and a cancellation at info.
pub fn log_progress<T, E: fmt::Display>(p: &Progress<'_, T, E>) {
    let poller = p.poller;
    let attempt = p.attempt;
    let retries_remaining = p.retries_remaining;

    match p.outcome {
        Outcome::Success(_) => trace!(poller, attempt, retries_remaining, "attempt succeeded"),
        Outcome::Failure(failure) => match failure {
            Failure::Timeout { timeout_ms } => {
                let timeout_ms = *timeout_ms;
                warn!(poller, attempt, retries_remaining, timeout_ms, "attempt timed out")
            }
            Failure::Aborted { .. } => {
                error!(poller, attempt, retries_remaining, reason = %failure, "attempt aborted")
            }
            Failure::Error(_) => {
                warn!(poller, attempt, retries_remaining, reason = %failure, "attempt failed")
            }
        },
        Outcome::Canceled => info!(poller, attempt, "attempt canceled the run"),
    }
}
