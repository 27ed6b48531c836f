mod logger;
pub use logger::*;

#[cfg(feature = "progress")]
pub mod progress;
