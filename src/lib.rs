//! archetype_streamable - Request-scoped reference counting for asset streaming
//!
//! # Features
//! - Opaque request ids retaining sets of assets
//! - Load deduplication (one in-flight load per asset)
//! - Callback fan-out on completion, immediate for already-loaded assets
//! - All-or-nothing requests, recoverable errors on stale releases
//! - Loader abstraction with mock and spawner-backed implementations
//! - Async runtime abstraction (Tokio, mock, custom)
//!
//! # Quick Start
//!
//! ```ignore
//! use archetype_streamable::{MockLoader, RequestRegistry};
//!
//! let loader = MockLoader::new();
//! let registry = RequestRegistry::with_loader(loader.clone());
//! let request = registry.request_assets_with(["meshes/rock.glb"], |asset, outcome| {
//!     println!("{asset}: {outcome:?}");
//! })?;
//! loader.complete("meshes/rock.glb");
//! registry.release_assets(request)?;
//! ```
//!
//! # Feature Flags
//!
//! - `runtime-mock`: Mock spawner for tests (default)
//! - `runtime-tokio`: Enable Tokio async runtime

// Core modules
pub mod loader;
pub mod registry;
pub mod runtime;

// Support modules
pub mod callback;
pub mod config;
pub mod id;

// Error types
mod error;
pub use error::{RegistryError, Result};

// Re-export main types from registry
pub use registry::metrics::{RegistryMetrics, RegistryMetricsHandle};
pub use registry::{AssetState, LoadCompletion, RequestRegistry, ScopedRequest};

// Re-export identifier and callback types
pub use callback::{FnCallback, LoadCallback, LoadOutcome, SharedCallback};
pub use config::{FailurePolicy, RegistryConfig};
pub use id::{AssetId, LoadEpisode, RequestId};

// Re-export loader types
pub use loader::{
    AssetSource, AssetStore, AsyncLoader, FileSource, MemorySource, MockLoader, SpawnedLoader,
};

// Re-export runtime types
pub use runtime::{AsyncSpawner, BoxFuture, MockSpawnBehavior, MockSpawner};
#[cfg(feature = "runtime-tokio")]
pub use runtime::TokioSpawner;

// Version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
