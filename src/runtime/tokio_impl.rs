//! Tokio async runtime implementation

use super::{AsyncRuntime, BoxFuture, JoinHandle};
use std::future::Future;
use std::time::{Duration, Instant};

/// Tokio-based runtime
///
/// Uses tokio's clock, so `#[tokio::test(start_paused = true)]` drives
/// timeouts and debounce windows deterministically.
#[derive(Clone, Debug, Default, Copy)]
pub struct TokioRuntime;

impl TokioRuntime {
    /// Create a new Tokio runtime handle
    pub fn new() -> Self {
        Self
    }
}

impl AsyncRuntime for TokioRuntime {
    fn spawn<F>(&self, task: F) -> JoinHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        JoinHandle::new(tokio::spawn(task))
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }

    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn runtime_name(&self) -> &'static str {
        "Tokio"
    }
}
