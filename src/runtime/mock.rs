//! Mock async runtime for testing
//!
//! Timers resolve immediately and the clock only moves when a test calls
//! [`MockRuntime::advance`], so interval logic can be driven step by step.

use super::{AsyncRuntime, BoxFuture, JoinHandle};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Spawn behavior for MockRuntime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockSpawnBehavior {
    /// Drop tasks immediately (don't execute)
    Drop,
    /// Block on tasks synchronously using a simple executor
    BlockSync,
}

/// Mock runtime with a manual clock
#[derive(Clone, Debug)]
pub struct MockRuntime {
    behavior: MockSpawnBehavior,
    origin: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRuntime {
    /// Create a mock runtime that drops spawned tasks
    pub fn new() -> Self {
        Self::with_behavior(MockSpawnBehavior::Drop)
    }

    /// Create a mock runtime with specific behavior
    pub fn with_behavior(behavior: MockSpawnBehavior) -> Self {
        Self {
            behavior,
            origin: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Create a mock runtime that runs spawned tasks synchronously
    pub fn blocking() -> Self {
        Self::with_behavior(MockSpawnBehavior::BlockSync)
    }

    /// Move the manual clock forward
    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }

    /// Time elapsed on the manual clock
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl AsyncRuntime for MockRuntime {
    fn spawn<F>(&self, task: F) -> JoinHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.behavior {
            MockSpawnBehavior::Drop => {
                drop(task);
                JoinHandle::new(())
            }
            MockSpawnBehavior::BlockSync => {
                futures::executor::block_on(task);
                JoinHandle::new(())
            }
        }
    }

    fn sleep(&self, _duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(futures::future::ready(()))
    }

    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn runtime_name(&self) -> &'static str {
        "Mock"
    }
}
