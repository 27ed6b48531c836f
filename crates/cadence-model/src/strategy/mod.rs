mod kind;
pub use kind::StrategyKind;
