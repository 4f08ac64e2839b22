//! Loader that runs fetches as tasks on an async spawner

use std::sync::Arc;

use super::{AssetSource, AssetStore, AsyncLoader, FetchStart, LoadCompletion};
use crate::id::{AssetId, LoadEpisode};
use crate::runtime::AsyncSpawner;

/// Async loader backed by an [`AssetSource`] and an [`AsyncSpawner`]
///
/// Each `begin_load` spawns one task that fetches the bytes, stores them
/// and reports back. Assets already in the store complete inside
/// `begin_load`. `unload` evicts the payload from the store; results of
/// fetches that finish after their asset was unloaded are discarded.
///
/// Calls are ordered by load episode, so a `begin_load` that arrives after a
/// newer one, or after the unload of its own episode, starts nothing.
pub struct SpawnedLoader<S: AsyncSpawner, Src: AssetSource> {
    spawner: S,
    source: Arc<Src>,
    store: AssetStore,
}

impl<S: AsyncSpawner, Src: AssetSource> SpawnedLoader<S, Src> {
    pub fn new(spawner: S, source: Src) -> Self {
        Self::with_store(spawner, source, AssetStore::new())
    }

    /// Share an existing store, e.g. one pre-populated with resident assets
    pub fn with_store(spawner: S, source: Src, store: AssetStore) -> Self {
        Self {
            spawner,
            source: Arc::new(source),
            store,
        }
    }

    /// Bytes of a loaded asset
    pub fn get(&self, asset: &AssetId) -> Option<Arc<[u8]>> {
        self.store.get(asset)
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    pub fn source(&self) -> &Src {
        &self.source
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }
}

impl<S: AsyncSpawner, Src: AssetSource> AsyncLoader for SpawnedLoader<S, Src> {
    fn resolve(&self, asset: &AssetId) -> bool {
        !asset.is_empty() && (self.store.contains(asset) || self.source.exists(asset))
    }

    fn begin_load(&self, asset: &AssetId, completion: LoadCompletion) {
        let token = match self.store.begin_fetch(asset, completion.episode()) {
            FetchStart::Resident => {
                completion.succeed();
                return;
            }
            FetchStart::Superseded => {
                log::debug!(
                    "Skipping load of {asset}: {} is superseded",
                    completion.episode()
                );
                return;
            }
            FetchStart::Fetch(token) => token,
        };

        let source = Arc::clone(&self.source);
        let store = self.store.clone();
        let asset = asset.clone();

        log::debug!(
            "Spawning fetch of {asset} on {}",
            self.spawner.runtime_name()
        );

        self.spawner.spawn(async move {
            match source.fetch(&asset).await {
                Ok(bytes) => {
                    let size = bytes.len();
                    if store.finish_fetch(&asset, token, bytes) {
                        log::debug!("Fetched {asset} ({size} bytes)");
                        completion.succeed();
                    } else {
                        log::debug!("Discarding fetch of {asset}: no longer wanted");
                    }
                }
                Err(err) => {
                    log::error!("Failed to fetch {asset}: {err:#}");
                    completion.fail();
                }
            }
        });
    }

    fn unload(&self, asset: &AssetId) {
        self.store.evict(asset);
    }

    fn unload_episode(&self, asset: &AssetId, episode: LoadEpisode) {
        self.store.evict_through(asset, episode);
    }
}

impl<S: AsyncSpawner, Src: AssetSource + std::fmt::Debug> std::fmt::Debug
    for SpawnedLoader<S, Src>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnedLoader")
            .field("spawner", &self.spawner)
            .field("source", &self.source)
            .field("store", &self.store)
            .finish()
    }
}
