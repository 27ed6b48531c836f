use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::{ModelError, ModelResult};

/// Built-in backoff strategies.
///
/// Strategies:
/// - `FixedInterval`: the same delay before every attempt (`interval`).
/// - `LinearBackoff`: `start + increment * attempt`.
/// - `ExponentialBackoff`: jittered `2^attempt` seconds, bounded by `[min, max]`.
///
/// The math lives in the core strategy registry; this enum only names the policy.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    FixedInterval,
    LinearBackoff,
    ExponentialBackoff,
}

impl StrategyKind {
    /// All built-in strategies, in registration order.
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::FixedInterval,
        StrategyKind::LinearBackoff,
        StrategyKind::ExponentialBackoff,
    ];

    /// Canonical registry name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::FixedInterval => "fixed-interval",
            StrategyKind::LinearBackoff => "linear-backoff",
            StrategyKind::ExponentialBackoff => "exponential-backoff",
        }
    }

    fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed-interval" | "fixed" => Ok(StrategyKind::FixedInterval),
            "linear-backoff" | "linear" => Ok(StrategyKind::LinearBackoff),
            "exponential-backoff" | "exponential" => Ok(StrategyKind::ExponentialBackoff),
            other => Err(ModelError::UnknownStrategy {
                name: other.to_string(),
                valid: Self::valid_names(),
            }),
        }
    }
}
