use tracing::{debug, trace};

use crate::{
    config::{PollConfig, ShouldContinue},
    error::{Failure, PollError},
    progress::Outcome,
    scheduler::attempt::AttemptError,
};

/// What the driver does after an attempt was evaluated.
pub(crate) enum Step<T, E> {
    /// Wait `delay_ms`, then make the next attempt.
    Retry { delay_ms: u64 },
    /// The run is over.
    Settle(Result<T, PollError<E>>),
}

/// Per-run bookkeeping shared by every driver.
///
/// Every attempt after the first consumes one unit of the retry budget,
/// so a run never makes more than `retries + 1` attempts.
pub(crate) struct RunState<E> {
    retries_remaining: u32,
    attempts: u32,
    failures: Vec<Failure<E>>,
}

impl<E> RunState<E> {
    pub(crate) fn new(retries: u32) -> Self {
        Self {
            retries_remaining: retries,
            attempts: 0,
            failures: Vec::new(),
        }
    }

    pub(crate) fn retries_remaining(&self) -> u32 {
        self.retries_remaining
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Hand over the accumulated failure history.
    pub(crate) fn take_failures(&mut self) -> Vec<Failure<E>> {
        std::mem::take(&mut self.failures)
    }

    /// Record one attempt result and decide what happens next.
    pub(crate) fn evaluate<T>(
        &mut self,
        result: Result<T, AttemptError<E>>,
        config: &PollConfig<T, E>,
        policy: &ShouldContinue<T, E>,
    ) -> Step<T, E> {
        let attempt = self.attempts;
        self.attempts += 1;

        match result {
            Ok(value) => {
                config.report(attempt, self.retries_remaining, Outcome::Success(&value));

                if !policy.check(Outcome::Success(&value)) {
                    trace!(poller = config.name(), attempt, "attempt succeeded; settling");
                    return Step::Settle(Ok(value));
                }
                if self.retries_remaining == 0 {
                    debug!(poller = config.name(), attempt, "retry budget spent while polling");
                    return Step::Settle(Err(self.exhausted()));
                }
                self.retries_remaining -= 1;
                Step::Retry {
                    delay_ms: config.next_interval(attempt),
                }
            }
            Err(AttemptError::Canceled) => {
                debug!(poller = config.name(), attempt, "attempt returned the cancellation sentinel");
                config.report(attempt, self.retries_remaining, Outcome::Canceled);
                Step::Settle(Err(PollError::Canceled {
                    failures: self.take_failures(),
                }))
            }
            Err(AttemptError::Failed(failure)) => {
                self.failures.push(failure);
                let keep_going = match self.failures.last() {
                    Some(last) => {
                        config.report(attempt, self.retries_remaining, Outcome::Failure(last));
                        self.retries_remaining > 0 && policy.check(Outcome::Failure(last))
                    }
                    None => false,
                };

                if self.retries_remaining == 0 {
                    debug!(poller = config.name(), attempt, "maximum retries reached");
                    return Step::Settle(Err(self.exhausted()));
                }
                if !keep_going {
                    debug!(poller = config.name(), attempt, "continue predicate declined retry");
                    return Step::Settle(Err(PollError::Declined {
                        failures: self.take_failures(),
                    }));
                }
                self.retries_remaining -= 1;
                debug!(
                    poller = config.name(),
                    attempt,
                    retries_remaining = self.retries_remaining,
                    "attempt failed; retrying"
                );
                Step::Retry {
                    delay_ms: config.next_interval(attempt),
                }
            }
        }
    }

    fn exhausted(&mut self) -> PollError<E> {
        PollError::RetriesExhausted {
            attempts: self.attempts,
            failures: self.take_failures(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    type Config = PollConfig<u32, &'static str>;

    fn config() -> Config {
        Config::builder().name("state").retries(2).interval_ms(10).build().unwrap()
    }

    fn fail(e: &'static str) -> Result<u32, AttemptError<&'static str>> {
        Err(AttemptError::Failed(Failure::Error(e)))
    }

    #[test]
    fn success_settles_when_predicate_declines() {
        let mut run = RunState::new(2);
        let step = run.evaluate(Ok(5), &config(), &ShouldContinue::on_error());

        assert!(matches!(step, Step::Settle(Ok(5))));
        assert_eq!(run.attempts(), 1);
        assert_eq!(run.retries_remaining(), 2);
    }

    #[test]
    fn failures_consume_budget_then_exhaust() {
        let cfg = config();
        let policy = ShouldContinue::on_error();
        let mut run = RunState::new(2);

        assert!(matches!(run.evaluate(fail("a"), &cfg, &policy), Step::Retry { delay_ms: 10 }));
        assert!(matches!(run.evaluate(fail("b"), &cfg, &policy), Step::Retry { delay_ms: 10 }));

        match run.evaluate(fail("c"), &cfg, &policy) {
            Step::Settle(Err(PollError::RetriesExhausted { attempts, failures })) => {
                assert_eq!(attempts, 3);
                let errs: Vec<_> = failures.iter().filter_map(Failure::as_error).copied().collect();
                assert_eq!(errs, vec!["a", "b", "c"]);
            }
            _ => panic!("expected exhaustion"),
        }
    }

    #[test]
    fn predicate_can_stop_after_failure() {
        let mut run = RunState::new(5);
        let step = run.evaluate(fail("x"), &config(), &ShouldContinue::never());

        match step {
            Step::Settle(Err(PollError::Declined { failures })) => assert_eq!(failures.len(), 1),
            _ => panic!("expected decline"),
        }
    }

    #[test]
    fn cancellation_keeps_history_and_ignores_budget() {
        let cfg = config();
        let policy = ShouldContinue::on_error();
        let mut run = RunState::new(10);

        let _ = run.evaluate(fail("first"), &cfg, &policy);
        match run.evaluate(Err(AttemptError::Canceled), &cfg, &policy) {
            Step::Settle(Err(PollError::Canceled { failures })) => assert_eq!(failures.len(), 1),
            _ => panic!("expected cancellation"),
        }
    }

    #[test]
    fn successful_polling_also_consumes_budget() {
        let cfg = config();
        let policy = ShouldContinue::always();
        let mut run = RunState::new(1);

        assert!(matches!(run.evaluate(Ok(1), &cfg, &policy), Step::Retry { .. }));
        match run.evaluate(Ok(2), &cfg, &policy) {
            Step::Settle(Err(PollError::RetriesExhausted { attempts, failures })) => {
                assert_eq!(attempts, 2);
                assert!(failures.is_empty());
            }
            _ => panic!("expected exhaustion"),
        }
    }

    #[test]
    fn progress_reports_every_attempt_with_index() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cfg = Config::builder()
            .retries(3)
            .on_progress(move |p| {
                sink.lock().unwrap().push((p.attempt, p.retries_remaining, p.outcome.is_success()));
            })
            .build()
            .unwrap();
        let policy = ShouldContinue::on_error();
        let mut run = RunState::new(3);

        let _ = run.evaluate(fail("a"), &cfg, &policy);
        let _ = run.evaluate(fail("b"), &cfg, &policy);
        let _ = run.evaluate(Ok(1), &cfg, &policy);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(0, 3, false), (1, 2, false), (2, 1, true)]
        );
    }

    #[test]
    fn delay_uses_index_of_completed_attempt() {
        let cfg = Config::builder()
            .retries(5)
            .next_interval(|attempt, _| 100 * u64::from(attempt))
            .build()
            .unwrap();
        let policy = ShouldContinue::on_error();
        let mut run = RunState::new(5);

        assert!(matches!(run.evaluate(fail("a"), &cfg, &policy), Step::Retry { delay_ms: 0 }));
        assert!(matches!(run.evaluate(fail("b"), &cfg, &policy), Step::Retry { delay_ms: 100 }));
    }
}
