//! Type-erased unit of work and the middleware that wraps it.
use std::{
    any::Any,
    future::Future,
    panic::{AssertUnwindSafe, catch_unwind, resume_unwind},
    pin::Pin,
    sync::Arc,
};

use crate::error::TaskError;

/// One pending attempt.
pub type BoxAttempt<T, E> = Pin<Box<dyn Future<Output = Result<T, TaskError<E>>> + Send>>;

type WorkFn<T, E> = Box<dyn FnMut() -> BoxAttempt<T, E> + Send>;

/// Zero-argument callable producing one attempt per call.
pub struct Work<T, E> {
    f: WorkFn<T, E>,
}

impl<T, E> Work<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Wrap an async closure.
    ///
    /// ```
    /// use cadence_core::{TaskError, Work};
    ///
    /// let work: Work<u32, String> = Work::new(|| async { Ok::<_, TaskError<String>>(42) });
    /// # drop(work);
    /// ```
    pub fn new<F, Fut>(mut f: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TaskError<E>>> + Send + 'static,
    {
        Self {
            f: Box::new(move || Box::pin(f())),
        }
    }

    /// Start one attempt.
    ///
    /// A panic while the attempt is being created (in the closure itself or in
    /// a before-hook) is carried into the returned future and re-raised when it
    /// is first polled, so it surfaces the same way as a panic in the async body.
    pub fn call(&mut self) -> BoxAttempt<T, E> {
        match catch_unwind(AssertUnwindSafe(|| (self.f)())) {
            Ok(attempt) => attempt,
            Err(payload) => Box::pin(rethrow(payload)),
        }
    }

    /// Run `before` right before every attempt starts and `after` once it finished,
    /// whatever its outcome.
    pub fn with_hooks<B, A>(self, before: B, after: A) -> Self
    where
        B: Fn() + Send + Sync + 'static,
        A: Fn() + Send + Sync + 'static,
    {
        let after = Arc::new(after);
        let mut inner = self.f;

        Self {
            f: Box::new(move || {
                before();
                let attempt = inner();
                let after = Arc::clone(&after);
                Box::pin(async move {
                    let res = attempt.await;
                    after();
                    res
                })
            }),
        }
    }
}

async fn rethrow<T, E>(payload: Box<dyn Any + Send>) -> Result<T, TaskError<E>> {
    resume_unwind(payload)
}
