use cadence_model::{DEFAULT_INTERVAL_MS, PARAM_INTERVAL, PollSpec, StrategyKind, StrategyParams};

use super::Backoff;

/// Same delay before every attempt: the configured `interval_ms`.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    defaults: StrategyParams,
}

impl Default for FixedInterval {
    fn default() -> Self {
        Self {
            defaults: StrategyParams::new().with(PARAM_INTERVAL, DEFAULT_INTERVAL_MS),
        }
    }
}

impl Backoff for FixedInterval {
    fn name(&self) -> &str {
        StrategyKind::FixedInterval.as_str()
    }

    fn defaults(&self) -> &StrategyParams {
        &self.defaults
    }

    fn next_interval(&self, _attempt: u32, spec: &PollSpec) -> Option<u64> {
        Some(spec.interval_ms)
    }
}
