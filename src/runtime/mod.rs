//! Async runtime abstraction for capability probing
//!
//! The probe needs three things from its host runtime: a way to spawn
//! debounce tasks, a timer for bounded waits, and a clock for re-probe
//! intervals. This module abstracts them so the probe works on tokio
//! and under a deterministic mock in tests.

pub mod mock;
#[cfg(feature = "runtime-tokio")]
pub mod tokio_impl;

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

/// A boxed future that can be sent across threads
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handle to a spawned async task
///
/// This is a type-erased handle that allows checking task completion.
#[derive(Debug)]
pub struct JoinHandle {
    inner: Box<dyn std::any::Any + Send>,
}

impl JoinHandle {
    /// Create a new join handle
    pub fn new<T: Send + 'static>(handle: T) -> Self {
        Self {
            inner: Box::new(handle),
        }
    }

    /// Try to downcast to a specific handle type
    pub fn downcast<T: 'static>(self) -> Option<T> {
        self.inner.downcast::<T>().ok().map(|b| *b)
    }
}

/// Async runtime trait
///
/// # Example
/// ```ignore
/// let runtime = TokioRuntime::new();
/// runtime.spawn(async move {
///     runtime.sleep(Duration::from_millis(250)).await;
/// });
/// ```
pub trait AsyncRuntime: Send + Sync + Clone + Debug + 'static {
    /// Spawn a background task
    fn spawn<F>(&self, task: F) -> JoinHandle
    where
        F: Future<Output = ()> + Send + 'static;

    /// Future that resolves after `duration`
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;

    /// Current instant on this runtime's clock
    fn now(&self) -> Instant;

    /// Get the name of this runtime (for debugging)
    fn runtime_name(&self) -> &'static str;
}

/// Outcome of [`with_timeout`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bounded<T> {
    Completed(T),
    TimedOut,
}

/// Race `future` against the runtime's timer.
///
/// The future is polled first, so an already-ready future always wins.
pub async fn with_timeout<R, F, T>(runtime: &R, duration: Duration, future: F) -> Bounded<T>
where
    R: AsyncRuntime,
    F: Future<Output = T> + Send,
{
    use futures::future::{select, Either};

    let future = Box::pin(future);
    match select(future, runtime.sleep(duration)).await {
        Either::Left((value, _)) => Bounded::Completed(value),
        Either::Right(((), _)) => Bounded::TimedOut,
    }
}

pub use mock::MockRuntime;

#[cfg(feature = "runtime-tokio")]
pub use tokio_impl::TokioRuntime;
