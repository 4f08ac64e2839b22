//! Tokio async runtime implementation
//!
//! Provides integration with the Tokio async runtime.

use super::AsyncSpawner;
use std::future::Future;
use tokio::runtime::Handle;

/// Tokio-based async spawner
///
/// Spawns tasks on the runtime behind the stored handle, so it can be used
/// from threads that are not themselves inside the runtime.
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    /// Create a spawner for a specific runtime
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Create a spawner for the runtime the caller is running in
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl AsyncSpawner for TokioSpawner {
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Detached; completion is reported by the task itself
        drop(self.handle.spawn(task));
    }

    fn runtime_name(&self) -> &'static str {
        "Tokio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_tokio_spawner() {
        let spawner = TokioSpawner::current().unwrap();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        let (tx, rx) = tokio::sync::oneshot::channel();

        spawner.spawn(async move {
            ran_clone.store(true, Ordering::SeqCst);
            let _ = tx.send(());
        });

        rx.await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_no_current_runtime() {
        assert!(TokioSpawner::current().is_none());
    }

    #[test]
    fn test_tokio_runtime_name() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let spawner = TokioSpawner::new(runtime.handle().clone());
        assert_eq!(spawner.runtime_name(), "Tokio");
    }
}
