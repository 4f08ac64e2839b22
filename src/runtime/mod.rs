//! Async runtime abstraction for the spawned loader
//!
//! Load tasks are handed to an [`AsyncSpawner`], so the loader works with
//! any runtime (tokio, a test executor, or a host's own task system).

pub mod mock;
#[cfg(feature = "runtime-tokio")]
pub mod tokio_impl;

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

/// A boxed future that can be sent across threads
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Async task spawner trait
///
/// # Example
/// ```ignore
/// let spawner = TokioSpawner::current().expect("inside a tokio runtime");
/// spawner.spawn(async {
///     // Async work here
/// });
/// ```
pub trait AsyncSpawner: Send + Sync + Clone + Debug + 'static {
    /// Spawn a background task. The spawner decides when it runs.
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Get the name of this runtime (for debugging)
    fn runtime_name(&self) -> &'static str;
}

// Re-export implementations
pub use mock::{MockSpawnBehavior, MockSpawner};

#[cfg(feature = "runtime-tokio")]
pub use tokio_impl::TokioSpawner;
