use cadence_model::{
    EXPONENTIAL_DEFAULT_MAX_MS, EXPONENTIAL_DEFAULT_MIN_MS, PARAM_MAX, PARAM_MIN, PollSpec,
    StrategyKind, StrategyParams,
};

use super::{Backoff, param};

/// Largest exponent used; beyond it `2^n` seconds is far past any sane `max`.
const MAX_EXPONENT: u32 = 64;

/// Jittered exponential delay bounded by `[min, max]`.
///
/// `min(max, round(rand * (2^attempt * 1000 - min) + min))`, floored at `min`.
/// The randomness spreads retries of many pollers that failed together.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    defaults: StrategyParams,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            defaults: StrategyParams::new()
                .with(PARAM_MIN, EXPONENTIAL_DEFAULT_MIN_MS)
                .with(PARAM_MAX, EXPONENTIAL_DEFAULT_MAX_MS),
        }
    }
}

impl ExponentialBackoff {
    /// Pure core of the computation with the random factor injected.
    fn compute(attempt: u32, min: u64, max: u64, rand: f64) -> u64 {
        let exp = attempt.min(MAX_EXPONENT) as i32;
        let ceiling = 2f64.powi(exp) * 1_000.0;
        let min_f = min as f64;

        let jittered = (rand * (ceiling - min_f) + min_f).round();
        jittered.max(min_f).min(max as f64) as u64
    }
}

impl Backoff for ExponentialBackoff {
    fn name(&self) -> &str {
        StrategyKind::ExponentialBackoff.as_str()
    }

    fn defaults(&self) -> &StrategyParams {
        &self.defaults
    }

    fn next_interval(&self, attempt: u32, spec: &PollSpec) -> Option<u64> {
        let min = param(spec, &self.defaults, PARAM_MIN, EXPONENTIAL_DEFAULT_MIN_MS);
        let max = param(spec, &self.defaults, PARAM_MAX, EXPONENTIAL_DEFAULT_MAX_MS);

        Some(Self::compute(attempt, min, max, rand::random::<f64>()))
    }
}
