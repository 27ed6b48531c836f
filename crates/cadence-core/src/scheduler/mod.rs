//! One-shot retry scheduler.
//!
//! [`poll`] drives a unit of work until the continue predicate, the retry budget,
//! the cancellation sentinel or the master deadline ends the run, and resolves
//! to exactly one outcome.
//!
//! Per attempt:
//! 1. start the work as its own task, guarded by the attempt timeout when set;
//! 2. report the outcome to the progress hook;
//! 3. settle, or wait the next interval and go again.
//!
//! When the master deadline fires the driver is dropped: nothing is scheduled
//! afterwards, and an attempt still in flight finishes unobserved.
use tracing::{debug, instrument, warn};

use crate::{
    config::{PollConfig, ShouldContinue},
    error::PollError,
    time::delay,
    work::Work,
};

pub(crate) mod attempt;
pub(crate) mod state;

use attempt::execute;
use state::{RunState, Step};

/// Run `work` under `config` and return the single terminal outcome.
///
/// Without an explicit predicate the run continues after failures and stops
/// on the first success ([`ShouldContinue::on_error`]).
#[instrument(level = "debug", skip_all, fields(poller = %config.name()))]
pub async fn poll<T, E>(mut work: Work<T, E>, config: PollConfig<T, E>) -> Result<T, PollError<E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    let policy = config
        .should_continue()
        .cloned()
        .unwrap_or_else(ShouldContinue::on_error);

    let master = config.master_timeout();
    let driver = drive(&mut work, &config, &policy);

    match master {
        Some(timeout_ms) => {
            debug!(timeout_ms, "using master timeout");
            tokio::select! {
                biased;
                _ = delay(timeout_ms) => {
                    warn!(timeout_ms, "master timeout reached");
                    Err(PollError::MasterTimeout { timeout_ms })
                }
                outcome = driver => outcome,
            }
        }
        None => driver.await,
    }
}

async fn drive<T, E>(
    work: &mut Work<T, E>,
    config: &PollConfig<T, E>,
    policy: &ShouldContinue<T, E>,
) -> Result<T, PollError<E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    let mut run = RunState::new(config.retries());

    loop {
        let result = execute(work.call(), config.attempt_timeout()).await;

        match run.evaluate(result, config, policy) {
            Step::Settle(outcome) => return outcome,
            Step::Retry { delay_ms } => {
                debug!(delay_ms, attempts = run.attempts(), "waiting before next attempt");
                delay(delay_ms).await;
            }
        }
    }
}
