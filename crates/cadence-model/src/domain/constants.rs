//! Well-known defaults and parameter keys.
//!
//! Strategy parameters are looked up by string key in [`crate::StrategyParams`];
//! keeping the keys here avoids scattering magic strings across strategies.

/// Fallback delay between attempts when nothing else yields one.
pub const DEFAULT_INTERVAL_MS: u64 = 1_000;

/// Additional attempts allowed after the first one.
pub const DEFAULT_RETRIES: u32 = 3;

/// Parameter key of the fixed-interval strategy.
pub const PARAM_INTERVAL: &str = "interval";

/// Parameter key: first delay of the linear strategy.
pub const PARAM_START: &str = "start";

/// Parameter key: per-attempt growth of the linear strategy.
pub const PARAM_INCREMENT: &str = "increment";

/// Parameter key: lower bound of the exponential strategy.
pub const PARAM_MIN: &str = "min";

/// Parameter key: upper bound of the exponential strategy.
pub const PARAM_MAX: &str = "max";

pub const LINEAR_DEFAULT_START_MS: u64 = 1_000;
pub const LINEAR_DEFAULT_INCREMENT_MS: u64 = 1_000;

pub const EXPONENTIAL_DEFAULT_MIN_MS: u64 = 1_000;
pub const EXPONENTIAL_DEFAULT_MAX_MS: u64 = 30_000;
