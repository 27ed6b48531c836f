pub mod config;
pub mod error;
pub mod id;
pub mod progress;
pub mod scheduler;
pub mod strategy;
pub mod ticker;
pub mod time;
pub mod work;

pub use config::{PollConfig, PollConfigBuilder, ShouldContinue};
pub use error::{CoreError, CoreResult, Failure, PollError, TaskError};
pub use id::{NameGenerator, SequentialNames};
pub use progress::{Outcome, Progress};
pub use scheduler::poll;
pub use strategy::{Backoff, StrategyRef, StrategyRegistry};
pub use ticker::{PollHandle, Ticker};
pub use work::Work;

pub mod prelude {
    pub use crate::config::{PollConfig, ShouldContinue};
    pub use crate::error::{CoreError, Failure, PollError, TaskError};
    pub use crate::scheduler::poll;
    pub use crate::ticker::{PollHandle, Ticker};
    pub use crate::work::Work;
    pub use cadence_model::{PollSpec, StrategyKind};
}
