//! Mock async spawner for testing
//!
//! Tasks can be dropped, run inline, or queued until the test drives them.

use super::{AsyncSpawner, BoxFuture};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

/// Spawn behavior for MockSpawner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockSpawnBehavior {
    /// Drop tasks immediately (don't execute)
    Drop,
    /// Block on tasks synchronously using a simple executor
    BlockSync,
    /// Hold tasks until [`MockSpawner::run_pending`] is called
    Queue,
}

/// Mock async spawner for testing
#[derive(Clone)]
pub struct MockSpawner {
    behavior: MockSpawnBehavior,
    queue: Arc<Mutex<VecDeque<BoxFuture<'static, ()>>>>,
}

impl Default for MockSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSpawner")
            .field("behavior", &self.behavior)
            .field("queued", &self.pending_tasks())
            .finish()
    }
}

impl MockSpawner {
    /// Create a new mock spawner that drops tasks
    pub fn new() -> Self {
        Self::with_behavior(MockSpawnBehavior::Drop)
    }

    /// Create a mock spawner with specific behavior
    pub fn with_behavior(behavior: MockSpawnBehavior) -> Self {
        Self {
            behavior,
            queue: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Create a mock spawner that runs tasks synchronously
    pub fn blocking() -> Self {
        Self::with_behavior(MockSpawnBehavior::BlockSync)
    }

    /// Create a mock spawner that queues tasks
    pub fn queued() -> Self {
        Self::with_behavior(MockSpawnBehavior::Queue)
    }

    pub fn behavior(&self) -> MockSpawnBehavior {
        self.behavior
    }

    /// Number of queued tasks not yet run
    pub fn pending_tasks(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run queued tasks to completion, including any they spawn.
    ///
    /// Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }

    /// Run only the oldest queued task
    pub fn run_next(&self) -> bool {
        // The queue lock must not be held while the task runs
        let task = self.queue.lock().pop_front();
        match task {
            Some(task) => {
                futures::executor::block_on(task);
                true
            }
            None => false,
        }
    }
}

impl AsyncSpawner for MockSpawner {
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.behavior {
            MockSpawnBehavior::Drop => drop(task),
            MockSpawnBehavior::BlockSync => futures::executor::block_on(task),
            MockSpawnBehavior::Queue => self.queue.lock().push_back(Box::pin(task)),
        }
    }

    fn runtime_name(&self) -> &'static str {
        "Mock"
    }
}
