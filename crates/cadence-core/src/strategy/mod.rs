//! Backoff strategies and the registry that names them.
//!
//! A strategy maps `(attempt, spec)` to the delay before the next attempt.
//! `attempt` is the 0-based index of the attempt that just completed,
//! so the delay before attempt 2 is computed with `attempt = 0`.
//!
//! Built-in strategies are registered under [`StrategyKind`] names;
//! callers may register their own policy objects next to them.
use std::{collections::BTreeMap, fmt, sync::Arc};

use cadence_model::{PollSpec, StrategyKind, StrategyParams};

use crate::error::{CoreError, CoreResult};

mod custom;
pub use custom::{FnBackoff, backoff_fn};

mod exponential;
pub use exponential::ExponentialBackoff;

mod fixed;
pub use fixed::FixedInterval;

mod linear;
pub use linear::LinearBackoff;

/// Interval-computation policy.
pub trait Backoff: Send + Sync + 'static {
    /// Registry name used in logs and lookups.
    fn name(&self) -> &str;

    /// Default parameters, overridable per run through [`PollSpec::params`].
    fn defaults(&self) -> &StrategyParams;

    /// Delay before the next attempt in milliseconds.
    ///
    /// `None` lets the scheduler fall back to the configured interval.
    fn next_interval(&self, attempt: u32, spec: &PollSpec) -> Option<u64>;
}

/// Shared handle to a strategy.
pub type StrategyRef = Arc<dyn Backoff>;

/// Resolve a strategy parameter: per-run override, then strategy default, then `fallback`.
pub(crate) fn param(spec: &PollSpec, defaults: &StrategyParams, key: &str, fallback: u64) -> u64 {
    spec.param(key)
        .or_else(|| defaults.get(key))
        .unwrap_or(fallback)
}

/// Named table of backoff strategies.
#[derive(Clone)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, StrategyRef>,
}

impl StrategyRegistry {
    /// Registry without any strategy.
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Registry holding the three built-in strategies.
    pub fn builtin() -> Self {
        let mut reg = Self::empty();
        for kind in StrategyKind::ALL {
            reg.register_arc(builtin(kind));
        }
        reg
    }

    /// Register a strategy under its own name, replacing any previous entry.
    pub fn register<B: Backoff>(&mut self, strategy: B) -> &mut Self {
        self.register_arc(Arc::new(strategy))
    }

    /// Register an already shared strategy.
    pub fn register_arc(&mut self, strategy: StrategyRef) -> &mut Self {
        self.strategies
            .insert(normalize(strategy.name()), strategy);
        self
    }

    /// Find a strategy by name.
    ///
    /// Short built-in aliases (`fixed`, `linear`, `exponential`) resolve to
    /// their canonical names. Fails with [`CoreError::UnknownStrategy`]
    /// listing the valid names.
    pub fn lookup(&self, name: &str) -> CoreResult<StrategyRef> {
        self.strategies
            .get(&normalize(name))
            .or_else(|| {
                let kind = name.parse::<StrategyKind>().ok()?;
                self.strategies.get(kind.as_str())
            })
            .cloned()
            .ok_or_else(|| CoreError::UnknownStrategy {
                name: name.to_string(),
                valid: self.names().collect::<Vec<_>>().join(","),
            })
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Shared instance of a built-in strategy.
pub fn builtin(kind: StrategyKind) -> StrategyRef {
    match kind {
        StrategyKind::FixedInterval => Arc::new(FixedInterval::default()),
        StrategyKind::LinearBackoff => Arc::new(LinearBackoff::default()),
        StrategyKind::ExponentialBackoff => Arc::new(ExponentialBackoff::default()),
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_contains_all_kinds() {
        let reg = StrategyRegistry::builtin();
        assert_eq!(reg.len(), 3);

        for kind in StrategyKind::ALL {
            let s = reg.lookup(kind.as_str()).unwrap();
            assert_eq!(s.name(), kind.as_str());
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let reg = StrategyRegistry::builtin();
        assert!(reg.lookup(" Linear-Backoff ").is_ok());
    }

    #[test]
    fn builtin_aliases_resolve_to_canonical_strategies() {
        let reg = StrategyRegistry::builtin();

        assert_eq!(reg.lookup("linear").unwrap().name(), "linear-backoff");
        assert_eq!(reg.lookup(" Fixed ").unwrap().name(), "fixed-interval");
        assert_eq!(reg.lookup("exponential").unwrap().name(), "exponential-backoff");
        assert!(StrategyRegistry::empty().lookup("linear").is_err());
    }

    #[test]
    fn unknown_strategy_lists_valid_names() {
        let reg = StrategyRegistry::builtin();
        let err = reg.lookup("fibonacci").err().unwrap();

        match err {
            CoreError::UnknownStrategy { name, valid } => {
                assert_eq!(name, "fibonacci");
                assert_eq!(valid, "exponential-backoff,fixed-interval,linear-backoff");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn custom_strategy_can_be_registered() {
        let mut reg = StrategyRegistry::builtin();
        reg.register(backoff_fn("constant-5", |_, _| Some(5)));

        let s = reg.lookup("constant-5").unwrap();
        assert_eq!(s.next_interval(7, &PollSpec::default()), Some(5));
        assert_eq!(reg.len(), 4);
    }

    #[test]
    fn empty_registry_rejects_everything() {
        let reg = StrategyRegistry::empty();
        assert!(reg.is_empty());
        assert!(matches!(
            reg.lookup("fixed-interval"),
            Err(CoreError::UnknownStrategy { .. })
        ));
    }

    #[test]
    fn param_prefers_spec_then_defaults_then_fallback() {
        let defaults = StrategyParams::new().with("start", 100);
        let mut spec = PollSpec::default();

        assert_eq!(param(&spec, &defaults, "start", 1), 100);
        assert_eq!(param(&spec, &defaults, "increment", 7), 7);

        spec.params.insert("start", 5);
        assert_eq!(param(&spec, &defaults, "start", 1), 5);
    }
}
