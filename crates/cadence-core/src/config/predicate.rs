use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use tracing::warn;

use crate::{progress::Outcome, time::panic_message};

type Predicate<T, E> = Arc<dyn Fn(Outcome<'_, T, E>) -> bool + Send + Sync>;

/// Decides, after each attempt, whether the run keeps going.
///
/// Two defaults exist and they differ:
/// - [`ShouldContinue::on_error`] is what [`crate::poll`] uses when none is configured:
///   retry after failures, stop on the first success;
/// - [`ShouldContinue::never`] is what [`crate::Ticker`] uses: the run is driven
///   entirely by an explicit predicate and stops after any attempt without one.
pub struct ShouldContinue<T, E> {
    label: &'static str,
    f: Predicate<T, E>,
}

impl<T, E> ShouldContinue<T, E> {
    /// Continue only when the attempt failed.
    pub fn on_error() -> Self {
        Self {
            label: "on-error",
            f: Arc::new(|o| o.is_failure()),
        }
    }

    /// Never continue.
    pub fn never() -> Self {
        Self {
            label: "never",
            f: Arc::new(|_| false),
        }
    }

    /// Always continue; only the retry budget or a deadline ends the run.
    pub fn always() -> Self {
        Self {
            label: "always",
            f: Arc::new(|_| true),
        }
    }

    /// Custom predicate.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(Outcome<'_, T, E>) -> bool + Send + Sync + 'static,
    {
        Self {
            label: "custom",
            f: Arc::new(f),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Evaluate the predicate. A panicking predicate counts as "stop".
    pub fn check(&self, outcome: Outcome<'_, T, E>) -> bool {
        match catch_unwind(AssertUnwindSafe(|| (self.f)(outcome))) {
            Ok(keep_going) => keep_going,
            Err(payload) => {
                warn!(reason = %panic_message(payload), "continue predicate panicked; stopping");
                false
            }
        }
    }
}

impl<T, E> Clone for ShouldContinue<T, E> {
    fn clone(&self) -> Self {
        Self {
            label: self.label,
            f: Arc::clone(&self.f),
        }
    }
}

impl<T, E> fmt::Debug for ShouldContinue<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShouldContinue({})", self.label)
    }
}
