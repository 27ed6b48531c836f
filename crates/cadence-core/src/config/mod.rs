//! Runtime configuration of a poller.
//!
//! [`PollConfig`] couples the declarative [`PollSpec`] with the resolved backoff
//! strategy and the behavioural hooks that only exist in code.
use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use tracing::{debug, warn};

use cadence_model::{PollSpec, StrategyKind, TimeoutMs};

use crate::{
    error::CoreResult,
    id::{NameGenerator, SequentialNames},
    progress::{Outcome, Progress},
    strategy::{Backoff, StrategyRef, StrategyRegistry},
    time::panic_message,
};

mod predicate;
pub use predicate::ShouldContinue;

/// Override of the strategy: `(attempt, spec) -> delay in ms`.
pub type IntervalFn = Arc<dyn Fn(u32, &PollSpec) -> u64 + Send + Sync>;

/// Hook invoked after every attempt.
pub type ProgressFn<T, E> = Arc<dyn Fn(&Progress<'_, T, E>) + Send + Sync>;

/// Immutable configuration for one poller.
pub struct PollConfig<T, E> {
    name: String,
    spec: PollSpec,
    strategy: StrategyRef,
    should_continue: Option<ShouldContinue<T, E>>,
    next_interval: Option<IntervalFn>,
    progress: Option<ProgressFn<T, E>>,
}

impl<T, E> PollConfig<T, E> {
    /// Start building a configuration from defaults.
    pub fn builder() -> PollConfigBuilder<T, E> {
        PollConfigBuilder::new(PollSpec::default())
    }

    /// Build a configuration from a spec without hooks.
    pub fn from_spec(spec: &PollSpec, registry: &StrategyRegistry) -> CoreResult<Self> {
        PollConfigBuilder::new(spec.clone())
            .registry(registry.clone())
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declarative part, with the resolved name filled in.
    pub fn spec(&self) -> &PollSpec {
        &self.spec
    }

    pub fn strategy(&self) -> &StrategyRef {
        &self.strategy
    }

    pub fn retries(&self) -> u32 {
        self.spec.retries
    }

    pub fn interval_ms(&self) -> u64 {
        self.spec.interval_ms
    }

    pub fn attempt_timeout(&self) -> Option<TimeoutMs> {
        self.spec.attempt_timeout()
    }

    pub fn master_timeout(&self) -> Option<TimeoutMs> {
        self.spec.master_timeout()
    }

    pub fn immediately(&self) -> bool {
        self.spec.immediately
    }

    /// Explicitly configured predicate, if any.
    ///
    /// Each driver applies its own default when this is `None`.
    pub fn should_continue(&self) -> Option<&ShouldContinue<T, E>> {
        self.should_continue.as_ref()
    }

    /// Delay before the attempt following `attempt` (0-based).
    ///
    /// Precedence: override, strategy, configured interval.
    pub fn next_interval(&self, attempt: u32) -> u64 {
        self.next_interval
            .as_ref()
            .map(|f| f(attempt, &self.spec))
            .or_else(|| self.strategy.next_interval(attempt, &self.spec))
            .unwrap_or(self.spec.interval_ms)
    }

    /// Invoke the progress hook; a panicking hook never affects scheduling.
    pub(crate) fn report(&self, attempt: u32, retries_remaining: u32, outcome: Outcome<'_, T, E>) {
        let Some(hook) = &self.progress else {
            return;
        };
        let progress = Progress {
            poller: &self.name,
            attempt,
            retries_remaining,
            outcome,
        };
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| hook(&progress))) {
            warn!(
                poller = %self.name,
                attempt,
                reason = %panic_message(payload),
                "progress hook panicked"
            );
        }
    }
}

impl<T, E> Clone for PollConfig<T, E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            spec: self.spec.clone(),
            strategy: Arc::clone(&self.strategy),
            should_continue: self.should_continue.clone(),
            next_interval: self.next_interval.clone(),
            progress: self.progress.clone(),
        }
    }
}

impl<T, E> fmt::Debug for PollConfig<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollConfig")
            .field("name", &self.name)
            .field("strategy", &self.strategy.name())
            .field("spec", &self.spec)
            .field("should_continue", &self.should_continue)
            .field("next_interval", &self.next_interval.as_ref().map(|_| "<fn>"))
            .field("progress", &self.progress.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl<T, E> fmt::Display for PollConfig<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PollConfig(name={}, strategy={}, retries={}, interval={}ms, timeout={:?}, master_timeout={:?})",
            self.name,
            self.strategy.name(),
            self.spec.retries,
            self.spec.interval_ms,
            self.attempt_timeout(),
            self.master_timeout(),
        )
    }
}

/// Builder for [`PollConfig`].
///
/// Strategy lookup happens in [`PollConfigBuilder::build`], so an unknown
/// strategy name is reported before any attempt runs.
pub struct PollConfigBuilder<T, E> {
    spec: PollSpec,
    registry: Option<StrategyRegistry>,
    strategy: Option<StrategyRef>,
    names: Option<Arc<dyn NameGenerator>>,
    should_continue: Option<ShouldContinue<T, E>>,
    next_interval: Option<IntervalFn>,
    progress: Option<ProgressFn<T, E>>,
}

impl<T, E> PollConfigBuilder<T, E> {
    /// Start from an existing spec.
    pub fn new(spec: PollSpec) -> Self {
        Self {
            spec,
            registry: None,
            strategy: None,
            names: None,
            should_continue: None,
            next_interval: None,
            progress: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.spec.name = Some(name.into());
        self
    }

    /// Select a registered strategy by name.
    pub fn strategy(mut self, name: impl Into<String>) -> Self {
        self.spec.strategy = name.into();
        self.strategy = None;
        self
    }

    /// Select a built-in strategy.
    pub fn strategy_kind(self, kind: StrategyKind) -> Self {
        self.strategy(kind.as_str())
    }

    /// Use a caller-supplied policy object instead of a registry lookup.
    pub fn custom_strategy<B: Backoff>(mut self, strategy: B) -> Self {
        self.spec.strategy = strategy.name().to_string();
        self.strategy = Some(Arc::new(strategy));
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.spec.retries = retries;
        self
    }

    pub fn interval_ms(mut self, interval_ms: u64) -> Self {
        self.spec.interval_ms = interval_ms;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: TimeoutMs) -> Self {
        self.spec.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn master_timeout_ms(mut self, timeout_ms: TimeoutMs) -> Self {
        self.spec.master_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn immediately(mut self, immediately: bool) -> Self {
        self.spec.immediately = immediately;
        self
    }

    /// Override one strategy parameter for this poller.
    pub fn param(mut self, key: impl Into<String>, value: u64) -> Self {
        self.spec.params.insert(key, value);
        self
    }

    /// Registry used to resolve the strategy name (built-ins by default).
    pub fn registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Name source used when no explicit name is set.
    pub fn names(mut self, names: Arc<dyn NameGenerator>) -> Self {
        self.names = Some(names);
        self
    }

    pub fn should_continue<F>(mut self, f: F) -> Self
    where
        F: Fn(Outcome<'_, T, E>) -> bool + Send + Sync + 'static,
    {
        self.should_continue = Some(ShouldContinue::from_fn(f));
        self
    }

    /// Use one of the named predicates (or a prebuilt one).
    pub fn continue_policy(mut self, policy: ShouldContinue<T, E>) -> Self {
        self.should_continue = Some(policy);
        self
    }

    pub fn next_interval<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, &PollSpec) -> u64 + Send + Sync + 'static,
    {
        self.next_interval = Some(Arc::new(f));
        self
    }

    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(&Progress<'_, T, E>) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(f));
        self
    }

    /// Validate the spec, resolve the strategy and assign a name.
    pub fn build(self) -> CoreResult<PollConfig<T, E>> {
        let mut spec = self.spec;
        spec.validate()?;

        let strategy = match self.strategy {
            Some(s) => s,
            None => self
                .registry
                .unwrap_or_default()
                .lookup(&spec.strategy)?,
        };

        let name = match spec.name.clone() {
            Some(name) => name,
            None => match &self.names {
                Some(names) => names.next_name(),
                None => SequentialNames::global().next_name(),
            },
        };
        spec.name = Some(name.clone());

        debug!(
            poller = %name,
            strategy = strategy.name(),
            interval_ms = spec.interval_ms,
            retries = spec.retries,
            timeout_ms = ?spec.attempt_timeout(),
            master_timeout_ms = ?spec.master_timeout(),
            "poller configured"
        );

        Ok(PollConfig {
            name,
            spec,
            strategy,
            should_continue: self.should_continue,
            next_interval: self.next_interval,
            progress: self.progress,
        })
    }
}
