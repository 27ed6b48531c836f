mod params;
pub use params::StrategyParams;

mod constants;
pub use constants::*;

/// Timeout value in milliseconds.
///
/// Used for per-attempt and whole-operation deadlines. A value of `0` means "no deadline".
pub type TimeoutMs = u64;
