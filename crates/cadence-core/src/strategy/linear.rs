use cadence_model::{
    LINEAR_DEFAULT_INCREMENT_MS, LINEAR_DEFAULT_START_MS, PARAM_INCREMENT, PARAM_START, PollSpec,
    StrategyKind, StrategyParams,
};

use super::{Backoff, param};

/// Delay grows by a constant step: `start + increment * attempt`.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    defaults: StrategyParams,
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self {
            defaults: StrategyParams::new()
                .with(PARAM_START, LINEAR_DEFAULT_START_MS)
                .with(PARAM_INCREMENT, LINEAR_DEFAULT_INCREMENT_MS),
        }
    }
}

impl Backoff for LinearBackoff {
    fn name(&self) -> &str {
        StrategyKind::LinearBackoff.as_str()
    }

    fn defaults(&self) -> &StrategyParams {
        &self.defaults
    }

    fn next_interval(&self, attempt: u32, spec: &PollSpec) -> Option<u64> {
        let start = param(spec, &self.defaults, PARAM_START, LINEAR_DEFAULT_START_MS);
        let increment = param(spec, &self.defaults, PARAM_INCREMENT, LINEAR_DEFAULT_INCREMENT_MS);

        Some(start.saturating_add(increment.saturating_mul(u64::from(attempt))))
    }
}
