mod domain;
pub use domain::{
    DEFAULT_INTERVAL_MS, DEFAULT_RETRIES, EXPONENTIAL_DEFAULT_MAX_MS, EXPONENTIAL_DEFAULT_MIN_MS,
    LINEAR_DEFAULT_INCREMENT_MS, LINEAR_DEFAULT_START_MS, PARAM_INCREMENT, PARAM_INTERVAL,
    PARAM_MAX, PARAM_MIN, PARAM_START,
};
pub use domain::{StrategyParams, TimeoutMs};

mod error;
pub use error::{ModelError, ModelResult};

mod spec;
pub use spec::PollSpec;

mod strategy;
pub use strategy::StrategyKind;
