//! Loader collaborators
//!
//! The registry never loads anything itself. It drives an [`AsyncLoader`],
//! which starts loads, later reports their outcome through a
//! [`LoadCompletion`], and accepts advisory unloads.

pub mod mock;
pub mod source;
pub mod spawned;
pub mod store;

pub use crate::registry::LoadCompletion;
pub use mock::MockLoader;
pub use source::{AssetSource, FileSource, MemorySource};
pub use spawned::SpawnedLoader;
pub use store::{AssetStore, FetchStart, FetchToken};

use std::sync::Arc;

use crate::id::{AssetId, LoadEpisode};

/// Asynchronous, host-supplied asset loader
///
/// The registry guarantees it never calls `begin_load` twice for the same
/// asset while a load is in flight. Loaders may complete synchronously from
/// inside `begin_load` when the asset is already cached.
///
/// Both calls are made outside the registry lock, so calls for one asset
/// issued from different threads may arrive out of order: an `unload` can
/// overtake the `begin_load` it follows, and a `begin_load` can be overtaken
/// by the one of a later episode. [`LoadCompletion::episode`] and
/// [`unload_episode`](Self::unload_episode) let a loader put them back in
/// order.
pub trait AsyncLoader: Send + Sync {
    /// Whether `asset` names something this loader can load
    fn resolve(&self, asset: &AssetId) -> bool {
        !asset.is_empty()
    }

    /// Start loading `asset` and report the outcome through `completion`
    fn begin_load(&self, asset: &AssetId, completion: LoadCompletion);

    /// Drop the loader's own hold on `asset`.
    ///
    /// Fire-and-forget. Memory may be reclaimed at any later point.
    fn unload(&self, asset: &AssetId);

    /// Unload issued after the load `episode` of `asset` was dropped.
    ///
    /// The registry calls this rather than [`unload`](Self::unload). Work for
    /// `episode` or an earlier one is no longer wanted; later episodes are
    /// unaffected.
    fn unload_episode(&self, asset: &AssetId, episode: LoadEpisode) {
        let _ = episode;
        self.unload(asset)
    }
}

impl<L: AsyncLoader + ?Sized> AsyncLoader for Arc<L> {
    fn resolve(&self, asset: &AssetId) -> bool {
        (**self).resolve(asset)
    }

    fn begin_load(&self, asset: &AssetId, completion: LoadCompletion) {
        (**self).begin_load(asset, completion)
    }

    fn unload(&self, asset: &AssetId) {
        (**self).unload(asset)
    }

    fn unload_episode(&self, asset: &AssetId, episode: LoadEpisode) {
        (**self).unload_episode(asset, episode)
    }
}

impl<L: AsyncLoader + ?Sized> AsyncLoader for Box<L> {
    fn resolve(&self, asset: &AssetId) -> bool {
        (**self).resolve(asset)
    }

    fn begin_load(&self, asset: &AssetId, completion: LoadCompletion) {
        (**self).begin_load(asset, completion)
    }

    fn unload(&self, asset: &AssetId) {
        (**self).unload(asset)
    }

    fn unload_episode(&self, asset: &AssetId, episode: LoadEpisode) {
        (**self).unload_episode(asset, episode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RequestRegistry;

    #[test]
    fn test_loader_trait_object() {
        let mock = MockLoader::new();
        let boxed: Box<dyn AsyncLoader> = Box::new(mock.clone());
        let registry = RequestRegistry::with_loader(boxed);

        registry.request_asset("a", None).unwrap();
        assert_eq!(mock.begin_load_calls(), vec![AssetId::new("a")]);
    }

    #[test]
    fn test_default_resolve_rejects_empty() {
        struct Noop;
        impl AsyncLoader for Noop {
            fn begin_load(&self, _asset: &AssetId, _completion: LoadCompletion) {}
            fn unload(&self, _asset: &AssetId) {}
        }

        assert!(!Noop.resolve(&AssetId::new("")));
        assert!(Noop.resolve(&AssetId::new("x")));
        assert!(Arc::new(Noop).resolve(&AssetId::new("x")));
    }

    #[test]
    fn test_unload_episode_forwards_to_unload() {
        let mock = MockLoader::new();
        let shared = Arc::new(mock.clone());

        shared.unload_episode(&AssetId::new("a"), LoadEpisode::from_raw(4));
        assert_eq!(mock.unload_calls(), vec![AssetId::new("a")]);
    }
}
