//! Stateful poller with an explicit lifecycle.
//!
//! A [`Ticker`] runs the same per-attempt algorithm as [`crate::poll`], one
//! tick at a time, and adds `start`/`pause`/`resume`/`cancel` on top of it.
//!
//! ```text
//! idle ── start ──► polling ──► ticking ──► polling ... ──► settled
//!                     │  ▲
//!               pause │  │ resume
//!                     ▼  │
//!                    paused
//! ```
//!
//! Flags live behind a mutex that is never held across an `.await` nor while
//! the work function, the predicate or the progress hook runs. Timers of one
//! run share a [`CancellationToken`] that is cancelled when the run settles,
//! and every scheduled tick carries an epoch so a superseded timer is ignored.
use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll},
};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{
    config::{PollConfig, ShouldContinue},
    error::{CoreError, CoreResult, PollError, TaskError},
    scheduler::{
        attempt::{AttemptError, execute},
        state::{RunState, Step},
    },
    time::delay,
    work::Work,
};

type Outcome<T, E> = Result<T, PollError<E>>;

/// Lifecycle controller around one unit of work.
///
/// Cloning yields another handle to the same poller. Without an explicit
/// predicate a ticker stops after the first attempt ([`ShouldContinue::never`]).
///
/// All methods that may fire an attempt (`start`, `tick`, `resume`) must be
/// called from within a Tokio runtime.
pub struct Ticker<T, E> {
    inner: Arc<Inner<T, E>>,
}

struct Inner<T, E> {
    state: Mutex<State<T, E>>,
}

struct State<T, E> {
    work: Option<Work<T, E>>,
    config: PollConfig<T, E>,
    run: Option<RunState<E>>,
    polling: bool,
    paused: bool,
    ticking: bool,
    run_id: u64,
    epoch: u64,
    outcome: Option<oneshot::Sender<Outcome<T, E>>>,
    token: CancellationToken,
}

impl<T, E> State<T, E> {
    /// Deliver the terminal outcome and tear the run down.
    fn settle(&mut self, outcome: Outcome<T, E>) {
        self.polling = false;
        self.paused = false;
        self.run = None;
        self.token.cancel();

        if let Some(tx) = self.outcome.take()
            && tx.send(outcome).is_err()
        {
            trace!(poller = self.config.name(), "outcome receiver dropped");
        }
    }

    fn settle_canceled(&mut self) {
        let failures = self
            .run
            .as_mut()
            .map(RunState::take_failures)
            .unwrap_or_default();
        self.settle(Err(PollError::Canceled { failures }));
    }
}

impl<T, E> Ticker<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new(work: Work<T, E>, config: PollConfig<T, E>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    work: Some(work),
                    config,
                    run: None,
                    polling: false,
                    paused: false,
                    ticking: false,
                    run_id: 0,
                    epoch: 0,
                    outcome: None,
                    token: CancellationToken::new(),
                }),
            }),
        }
    }

    /// Build a ticker straight from an async closure.
    pub fn from_fn<F, Fut>(f: F, config: PollConfig<T, E>) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TaskError<E>>> + Send + 'static,
    {
        Self::new(Work::new(f), config)
    }

    /// Begin a run.
    ///
    /// The first attempt fires right away, or after one interval when
    /// `immediately` is off. Fails with [`CoreError::AlreadyPolling`] while a
    /// run is active or an attempt of a previous run is still outstanding.
    pub fn start(&self) -> CoreResult<PollHandle<T, E>> {
        let (tx, rx) = oneshot::channel();
        let immediately = {
            let mut state = self.lock();
            if state.polling || state.ticking {
                return Err(CoreError::AlreadyPolling);
            }

            state.run_id += 1;
            state.run = Some(RunState::new(state.config.retries()));
            state.polling = true;
            state.paused = false;
            state.outcome = Some(tx);
            state.token = CancellationToken::new();

            debug!(poller = state.config.name(), run = state.run_id, "ticker started");

            if let Some(ms) = state.config.master_timeout() {
                self.arm_master(&state, ms);
            }

            let immediately = state.config.immediately();
            if !immediately {
                let interval = state.config.interval_ms();
                self.schedule(&mut state, interval);
            }
            immediately
        };

        if immediately {
            self.tick();
        }
        Ok(PollHandle { rx })
    }

    /// Run one step of the loop now.
    ///
    /// Ignored while an attempt is outstanding, while paused, or when no run
    /// is active.
    pub fn tick(&self) {
        self.tick_at(None);
    }

    /// Suspend scheduling of new attempts; the retry budget is kept.
    pub fn pause(&self) {
        let mut state = self.lock();
        if !state.polling || state.paused {
            return;
        }
        state.paused = true;
        debug!(poller = state.config.name(), "ticker paused");
    }

    /// Leave the paused state and tick right away.
    pub fn resume(&self) {
        {
            let mut state = self.lock();
            if !state.polling || !state.paused {
                return;
            }
            state.paused = false;
            debug!(poller = state.config.name(), "ticker resumed");
        }
        self.tick();
    }

    /// Stop the run.
    ///
    /// Without an outstanding attempt the run settles [`PollError::Canceled`]
    /// at once. Otherwise the attempt is left to finish, its result is
    /// discarded and its completion settles the run as canceled.
    pub fn cancel(&self) {
        let mut state = self.lock();
        if !state.polling {
            return;
        }
        state.polling = false;
        state.paused = false;
        state.token.cancel();
        debug!(poller = state.config.name(), ticking = state.ticking, "ticker canceled");

        if !state.ticking {
            state.settle_canceled();
        }
    }

    /// Replace the work function; takes effect from the next attempt.
    pub fn set_work(&self, work: Work<T, E>) {
        self.lock().work = Some(work);
    }

    /// Replace the configuration; takes effect from the next attempt.
    ///
    /// The retry budget of a run in progress is fixed when it starts.
    pub fn set_config(&self, config: PollConfig<T, E>) {
        self.lock().config = config;
    }

    pub fn is_polling(&self) -> bool {
        self.lock().polling
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    pub fn is_ticking(&self) -> bool {
        self.lock().ticking
    }

    pub fn name(&self) -> String {
        self.lock().config.name().to_string()
    }

    pub fn config(&self) -> PollConfig<T, E> {
        self.lock().config.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State<T, E>> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `expected` is the epoch of a scheduled tick; `None` for a direct call.
    fn tick_at(&self, expected: Option<u64>) {
        let (mut work, run_id, timeout) = {
            let mut state = self.lock();
            if let Some(epoch) = expected
                && epoch != state.epoch
            {
                trace!(poller = state.config.name(), epoch, "stale tick ignored");
                return;
            }
            if !state.polling || state.paused || state.ticking {
                trace!(
                    poller = state.config.name(),
                    polling = state.polling,
                    paused = state.paused,
                    ticking = state.ticking,
                    "tick ignored"
                );
                return;
            }
            let Some(work) = state.work.take() else {
                warn!(poller = state.config.name(), "no work to run");
                return;
            };

            state.ticking = true;
            state.epoch += 1;
            (work, state.run_id, state.config.attempt_timeout())
        };

        let attempt = work.call();

        {
            let mut state = self.lock();
            if state.work.is_none() {
                state.work = Some(work);
            }
        }

        let ticker = self.clone();
        tokio::spawn(async move {
            let result = execute(attempt, timeout).await;
            ticker.complete(run_id, result);
        });
    }

    fn complete(&self, run_id: u64, result: Result<T, AttemptError<E>>) {
        let (mut run, config) = {
            let mut state = self.lock();
            if state.run_id != run_id {
                return;
            }
            if !state.polling {
                state.ticking = false;
                if state.outcome.is_some() {
                    state.settle_canceled();
                }
                return;
            }
            let Some(run) = state.run.take() else {
                state.ticking = false;
                return;
            };
            (run, state.config.clone())
        };

        let policy = config
            .should_continue()
            .cloned()
            .unwrap_or_else(ShouldContinue::never);
        let step = run.evaluate(result, &config, &policy);

        let mut state = self.lock();
        state.ticking = false;
        if state.run_id != run_id {
            return;
        }
        if !state.polling {
            if state.outcome.is_some() {
                state.run = Some(run);
                state.settle_canceled();
            }
            return;
        }

        match step {
            Step::Settle(outcome) => state.settle(outcome),
            Step::Retry { delay_ms } => {
                debug!(
                    poller = config.name(),
                    delay_ms,
                    retries_remaining = run.retries_remaining(),
                    "next tick scheduled"
                );
                state.run = Some(run);
                self.schedule(&mut state, delay_ms);
            }
        }
    }

    fn expire(&self, run_id: u64, timeout_ms: u64) {
        let mut state = self.lock();
        if state.run_id != run_id || !state.polling {
            return;
        }
        warn!(poller = state.config.name(), timeout_ms, "master timeout reached");
        state.settle(Err(PollError::MasterTimeout { timeout_ms }));
    }

    /// Fire a tick after `delay_ms`, unless the run settles or another tick
    /// happens first.
    fn schedule(&self, state: &mut State<T, E>, delay_ms: u64) {
        state.epoch += 1;
        let epoch = state.epoch;
        let token = state.token.clone();
        let ticker = self.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = delay(delay_ms) => ticker.tick_at(Some(epoch)),
            }
        });
    }

    fn arm_master(&self, state: &State<T, E>, timeout_ms: u64) {
        let token = state.token.clone();
        let run_id = state.run_id;
        let ticker = self.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = delay(timeout_ms) => ticker.expire(run_id, timeout_ms),
            }
        });
    }
}

impl<T, E> Clone for Ticker<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for Ticker<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Ticker")
            .field("name", &state.config.name())
            .field("polling", &state.polling)
            .field("paused", &state.paused)
            .field("ticking", &state.ticking)
            .field("run", &state.run_id)
            .finish()
    }
}

/// Resolves to the single outcome of one [`Ticker`] run.
///
/// Resolves to [`PollError::Abandoned`] if every ticker handle is dropped
/// before the run settled.
#[must_use = "the outcome of a run is only observable through its handle"]
pub struct PollHandle<T, E> {
    rx: oneshot::Receiver<Outcome<T, E>>,
}

impl<T, E> Future for PollHandle<T, E> {
    type Output = Outcome<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(PollError::Abandoned)))
    }
}

impl<T, E> fmt::Debug for PollHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicU32, Ordering},
        time::Duration,
    };

    use tokio::time::Instant;

    use super::*;

    type Config = PollConfig<u32, String>;

    fn counting(fail_first: u32, calls: Arc<AtomicU32>) -> Work<u32, String> {
        Work::new(move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < fail_first {
                    Err(TaskError::Fail(format!("failure {n}")))
                } else {
                    Ok(n)
                }
            }
        })
    }

    fn counter() -> Arc<AtomicU32> {
        Arc::new(AtomicU32::new(0))
    }

    fn retrying(retries: u32, interval_ms: u64) -> Config {
        Config::builder()
            .name("ticker")
            .retries(retries)
            .interval_ms(interval_ms)
            .continue_policy(ShouldContinue::on_error())
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn runs_until_success_with_explicit_predicate() {
        let calls = counter();
        let ticker = Ticker::new(counting(2, Arc::clone(&calls)), retrying(5, 10));

        let res = ticker.start().unwrap().await;

        assert_eq!(res.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!ticker.is_polling());
        assert!(!ticker.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn default_predicate_stops_after_first_attempt() {
        let calls = counter();
        let cfg = Config::builder().retries(5).interval_ms(10).build().unwrap();
        let ticker = Ticker::new(counting(u32::MAX, Arc::clone(&calls)), cfg);

        let err = ticker.start().unwrap().await.unwrap_err();

        assert!(matches!(err, PollError::Declined { ref failures } if failures.len() == 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_rejected_while_polling() {
        let ticker = Ticker::new(counting(u32::MAX, counter()), retrying(3, 1_000));

        let _handle = ticker.start().unwrap();
        assert!(matches!(ticker.start(), Err(CoreError::AlreadyPolling)));
    }

    #[tokio::test(start_paused = true)]
    async fn can_be_restarted_after_settling() {
        let calls = counter();
        let ticker = Ticker::new(counting(1, Arc::clone(&calls)), retrying(1, 10));

        assert_eq!(ticker.start().unwrap().await.unwrap(), 1);
        assert_eq!(ticker.start().unwrap().await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_start_waits_one_interval() {
        let calls = counter();
        let cfg = Config::builder().interval_ms(100).immediately(false).build().unwrap();
        let ticker = Ticker::new(counting(0, Arc::clone(&calls)), cfg);

        let handle = ticker.start().unwrap();
        delay(50).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let start = Instant::now();
        assert_eq!(handle.await.unwrap(), 0);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn tick_is_ignored_when_idle() {
        let calls = counter();
        let ticker = Ticker::new(counting(0, Arc::clone(&calls)), retrying(3, 10));

        ticker.tick();
        delay(10).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!ticker.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn tick_is_ignored_while_an_attempt_is_outstanding() {
        let calls = counter();
        let c = Arc::clone(&calls);
        let work: Work<u32, String> = Work::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
            async {
                delay(100).await;
                Ok(7)
            }
        });
        let ticker = Ticker::new(work, retrying(3, 10));

        let handle = ticker.start().unwrap();
        assert!(ticker.is_ticking());
        ticker.tick();
        ticker.tick();

        assert_eq!(handle.await.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_suspends_and_resume_keeps_retry_budget() {
        let calls = counter();
        let ticker = Ticker::new(counting(u32::MAX, Arc::clone(&calls)), retrying(3, 100));

        let handle = ticker.start().unwrap();
        delay(50).await;
        ticker.pause();
        assert!(ticker.is_paused());

        delay(1_000).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(ticker.is_polling());

        ticker.resume();
        assert!(!ticker.is_paused());

        match handle.await.unwrap_err() {
            PollError::RetriesExhausted { attempts, failures } => {
                assert_eq!(attempts, 4);
                assert_eq!(failures.len(), 4);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume_are_noops_outside_a_run() {
        let ticker = Ticker::new(counting(0, counter()), retrying(3, 10));

        ticker.pause();
        assert!(!ticker.is_paused());
        ticker.resume();
        assert!(!ticker.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_between_attempts_settles_at_once() {
        let ticker = Ticker::new(counting(u32::MAX, counter()), retrying(3, 1_000));

        let handle = ticker.start().unwrap();
        delay(10).await;
        let start = Instant::now();
        ticker.cancel();

        match handle.await.unwrap_err() {
            PollError::Canceled { failures } => assert_eq!(failures.len(), 1),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(!ticker.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_attempt_settles_when_it_completes() {
        let work: Work<u32, String> = Work::new(|| async {
            delay(100).await;
            Ok(1)
        });
        let ticker = Ticker::new(work, retrying(3, 10));

        let start = Instant::now();
        let handle = ticker.start().unwrap();
        delay(10).await;
        ticker.cancel();
        assert!(ticker.is_ticking());
        assert!(!ticker.is_polling());

        assert!(handle.await.unwrap_err().is_canceled());
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert!(!ticker.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn master_timeout_settles_the_run() {
        let calls = counter();
        let cfg = Config::builder()
            .retries(10)
            .interval_ms(1_000)
            .master_timeout_ms(50)
            .continue_policy(ShouldContinue::on_error())
            .build()
            .unwrap();
        let ticker = Ticker::new(counting(u32::MAX, Arc::clone(&calls)), cfg);

        let start = Instant::now();
        let err = ticker.start().unwrap().await.unwrap_err();

        assert!(err.is_master_timeout());
        assert!(start.elapsed() < Duration::from_millis(60));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!ticker.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn work_swap_applies_to_next_attempt() {
        let ticker = Ticker::new(counting(u32::MAX, counter()), retrying(3, 100));

        let handle = ticker.start().unwrap();
        delay(10).await;
        ticker.set_work(Work::new(|| async { Ok(99) }));

        assert_eq!(handle.await.unwrap(), 99);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_a_paused_ticker_abandons_the_run() {
        let ticker = Ticker::new(counting(u32::MAX, counter()), retrying(3, 100));

        let handle = ticker.start().unwrap();
        ticker.pause();
        drop(ticker);

        assert!(matches!(handle.await, Err(PollError::Abandoned)));
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_work_closure_is_recorded_and_the_run_goes_on() {
        let calls = counter();
        let c = Arc::clone(&calls);
        let work: Work<u32, String> = Work::new(move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            assert!(n != 1, "closure broke");
            async move {
                match n {
                    0 => Err(TaskError::Fail("cold".to_string())),
                    _ => Ok(n),
                }
            }
        });
        let ticker = Ticker::new(work, retrying(3, 10));

        assert_eq!(ticker.start().unwrap().await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!ticker.is_polling());
        assert!(!ticker.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn master_timeout_wins_over_attempt_in_flight() {
        let work: Work<u32, String> = Work::new(|| async {
            delay(100).await;
            Ok(1)
        });
        let cfg = Config::builder()
            .retries(3)
            .master_timeout_ms(50)
            .continue_policy(ShouldContinue::on_error())
            .build()
            .unwrap();
        let ticker = Ticker::new(work, cfg);

        let start = Instant::now();
        let err = ticker.start().unwrap().await.unwrap_err();

        assert!(err.is_master_timeout(), "{err:?}");
        assert!(start.elapsed() < Duration::from_millis(60));

        delay(100).await;
        assert!(!ticker.is_ticking());
        assert!(!ticker.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn config_swap_applies_to_next_attempt_and_keeps_budget() {
        let calls = counter();
        let ticker = Ticker::new(counting(u32::MAX, Arc::clone(&calls)), retrying(3, 100));

        let handle = ticker.start().unwrap();
        delay(10).await;

        // No predicate and no budget of its own: only the predicate may change the run.
        let swapped = Config::builder().name("swapped").retries(0).interval_ms(100).build().unwrap();
        ticker.set_config(swapped);
        assert_eq!(ticker.name(), "swapped");

        match handle.await.unwrap_err() {
            PollError::Declined { failures } => assert_eq!(failures.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn master_timeout_during_evaluation_leaves_no_run_behind() {
        let slot: Arc<Mutex<Option<Ticker<u32, String>>>> = Arc::new(Mutex::new(None));
        let hook_slot = Arc::clone(&slot);
        let cfg = Config::builder()
            .retries(3)
            .interval_ms(10)
            .continue_policy(ShouldContinue::on_error())
            .on_progress(move |_| {
                if let Some(ticker) = hook_slot.lock().unwrap().as_ref() {
                    ticker.expire(1, 5);
                }
            })
            .build()
            .unwrap();
        let ticker = Ticker::new(counting(u32::MAX, counter()), cfg);
        *slot.lock().unwrap() = Some(ticker.clone());

        let err = ticker.start().unwrap().await.unwrap_err();
        assert!(matches!(err, PollError::MasterTimeout { timeout_ms: 5 }), "{err:?}");

        delay(10).await;
        assert!(ticker.lock().run.is_none());
        assert!(!ticker.is_ticking());
        slot.lock().unwrap().take();
    }

    #[test]
    fn exposes_its_configuration() {
        let ticker = Ticker::new(counting(0, counter()), retrying(4, 25));

        assert_eq!(ticker.name(), "ticker");
        assert_eq!(ticker.config().retries(), 4);
        assert_eq!(ticker.config().interval_ms(), 25);
        assert!(format!("{ticker:?}").contains("polling: false"));
    }
}
