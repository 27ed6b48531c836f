use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_INTERVAL_MS, DEFAULT_RETRIES, StrategyKind, StrategyParams,
    domain::TimeoutMs,
    error::{ModelError, ModelResult},
};

/// Declarative, serializable part of a poller configuration.
///
/// `PollSpec` describes *how* a unit of work is retried; the behavioural hooks
/// (continue predicate, interval override, progress callback) are attached in code
/// when the spec is turned into a runtime configuration.
///
/// Fields cover:
/// - identity (`name`)
/// - delay computation (`strategy`, `interval_ms`, `params`)
/// - budgets (`retries`, `timeout_ms`, `master_timeout_ms`)
/// - start-up behaviour of the lifecycle controller (`immediately`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollSpec {
    /// Human-readable poller name used in logs.
    ///
    /// When absent a unique `Poller-<n>` name is generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Name of a registered backoff strategy.
    pub strategy: String,
    /// Maximum number of additional attempts after the first one.
    pub retries: u32,
    /// Fallback delay between attempts in milliseconds.
    pub interval_ms: u64,
    /// Per-attempt deadline in milliseconds; `None` or `0` means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<TimeoutMs>,
    /// Whole-operation deadline in milliseconds; `None` or `0` means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_timeout_ms: Option<TimeoutMs>,
    /// Whether a lifecycle controller fires its first attempt right away
    /// or waits one `interval_ms` first.
    pub immediately: bool,
    /// Per-run overrides of the strategy's default parameters.
    #[serde(skip_serializing_if = "StrategyParams::is_empty")]
    pub params: StrategyParams,
}

impl Default for PollSpec {
    fn default() -> Self {
        Self {
            name: None,
            strategy: StrategyKind::default().as_str().to_string(),
            retries: DEFAULT_RETRIES,
            interval_ms: DEFAULT_INTERVAL_MS,
            timeout_ms: None,
            master_timeout_ms: None,
            immediately: true,
            params: StrategyParams::new(),
        }
    }
}

impl PollSpec {
    /// Spec using the given built-in strategy and defaults for everything else.
    pub fn with_strategy(kind: StrategyKind) -> Self {
        Self {
            strategy: kind.as_str().to_string(),
            ..Default::default()
        }
    }

    /// Per-attempt deadline, with `0` normalized to "none".
    pub fn attempt_timeout(&self) -> Option<TimeoutMs> {
        self.timeout_ms.filter(|ms| *ms > 0)
    }

    /// Whole-operation deadline, with `0` normalized to "none".
    pub fn master_timeout(&self) -> Option<TimeoutMs> {
        self.master_timeout_ms.filter(|ms| *ms > 0)
    }

    /// Look up a strategy parameter override.
    pub fn param(&self, key: &str) -> Option<u64> {
        self.params.get(key)
    }

    /// Validate the spec before it is used to build a poller.
    ///
    /// Rules:
    /// - `strategy` is not empty or whitespace-only;
    /// - `name`, when present, is not blank.
    pub fn validate(&self) -> ModelResult<()> {
        if self.strategy.trim().is_empty() {
            return Err(ModelError::Invalid("strategy name is empty".into()));
        }
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            return Err(ModelError::Invalid("poller name is blank".into()));
        }
        Ok(())
    }
}
