use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide sequence backing default poller names.
static GLOBAL_NAMES: SequentialNames = SequentialNames::new("Poller");

/// Source of names for pollers that were not given one.
pub trait NameGenerator: Send + Sync {
    fn next_name(&self) -> String;
}

/// Monotonically increasing `{prefix}-{seq}` names.
///
/// The process-wide instance starts at `Poller-0`; tests inject their own
/// instance to get deterministic names.
#[derive(Debug)]
pub struct SequentialNames {
    prefix: &'static str,
    seq: AtomicU64,
}

impl SequentialNames {
    pub const fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            seq: AtomicU64::new(0),
        }
    }

    /// Shared generator used when no other one is configured.
    pub fn global() -> &'static SequentialNames {
        &GLOBAL_NAMES
    }
}

impl NameGenerator for SequentialNames {
    fn next_name(&self) -> String {
        format!(
            "{prefix}-{seq}",
            prefix = self.prefix,
            seq = self.seq.fetch_add(1, Ordering::Relaxed)
        )
    }
}
