use std::fmt;

use cadence_model::{PollSpec, StrategyParams};

use super::Backoff;

/// Caller-supplied strategy backed by a closure.
pub struct FnBackoff<F> {
    name: String,
    defaults: StrategyParams,
    f: F,
}

impl<F> FnBackoff<F>
where
    F: Fn(u32, &PollSpec) -> Option<u64> + Send + Sync + 'static,
{
    /// Attach default parameters the closure can read through the spec.
    pub fn with_defaults(mut self, defaults: StrategyParams) -> Self {
        self.defaults = defaults;
        self
    }
}

/// Build a named strategy from a closure `(attempt, spec) -> delay`.
pub fn backoff_fn<F>(name: impl Into<String>, f: F) -> FnBackoff<F>
where
    F: Fn(u32, &PollSpec) -> Option<u64> + Send + Sync + 'static,
{
    FnBackoff {
        name: name.into(),
        defaults: StrategyParams::new(),
        f,
    }
}

impl<F> Backoff for FnBackoff<F>
where
    F: Fn(u32, &PollSpec) -> Option<u64> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn defaults(&self) -> &StrategyParams {
        &self.defaults
    }

    fn next_interval(&self, attempt: u32, spec: &PollSpec) -> Option<u64> {
        (self.f)(attempt, spec)
    }
}

impl<F> fmt::Debug for FnBackoff<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBackoff")
            .field("name", &self.name)
            .field("defaults", &self.defaults)
            .finish()
    }
}
