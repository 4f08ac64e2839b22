//! Loaded payload storage
//!
//! Holds the bytes of loaded assets for the spawned loader, with memory
//! accounting. Removing a payload only drops the store's reference;
//! readers holding the `Arc` keep it alive until they let go.
//!
//! Fetches and evictions are ordered by [`LoadEpisode`]. For every asset the
//! store remembers the newest episode that started a fetch and the newest
//! episode that was unloaded, so work arriving late for an older episode is
//! refused instead of clobbering newer state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::id::{AssetId, LoadEpisode};

/// Token identifying one in-flight fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchToken(LoadEpisode);

impl FetchToken {
    pub fn episode(&self) -> LoadEpisode {
        self.0
    }
}

/// How a load episode should proceed, as decided by [`AssetStore::begin_fetch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStart {
    /// The payload is already stored and now belongs to this episode
    Resident,
    /// Fetch the bytes and hand them back with this token
    Fetch(FetchToken),
    /// A newer episode started, or this one was already unloaded
    Superseded,
}

struct StoredPayload {
    bytes: Arc<[u8]>,
    episode: LoadEpisode,
}

/// Per-asset episode watermarks
#[derive(Default, Clone, Copy)]
struct EpisodeMarks {
    newest_fetch: LoadEpisode,
    unloaded_through: LoadEpisode,
}

impl EpisodeMarks {
    fn admits(&self, episode: LoadEpisode) -> bool {
        episode > self.newest_fetch && episode > self.unloaded_through
    }
}

#[derive(Default)]
struct StoreMaps {
    payloads: HashMap<AssetId, StoredPayload>,
    marks: HashMap<AssetId, EpisodeMarks>,
}

#[derive(Default)]
struct StoreInner {
    maps: RwLock<StoreMaps>,
    current_memory: AtomicUsize,
}

/// Shared map of loaded asset payloads
///
/// Episodes come from a single registry, so a store should back the loader
/// of one registry only.
#[derive(Clone, Default)]
pub struct AssetStore {
    inner: Arc<StoreInner>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload of a loaded asset
    pub fn get(&self, asset: &AssetId) -> Option<Arc<[u8]>> {
        self.inner
            .maps
            .read()
            .payloads
            .get(asset)
            .map(|stored| Arc::clone(&stored.bytes))
    }

    pub fn contains(&self, asset: &AssetId) -> bool {
        self.inner.maps.read().payloads.contains_key(asset)
    }

    /// Number of stored payloads
    pub fn len(&self) -> usize {
        self.inner.maps.read().payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.maps.read().payloads.is_empty()
    }

    /// Gets the bytes currently held by the store
    pub fn memory_usage(&self) -> usize {
        self.inner.current_memory.load(Ordering::Relaxed)
    }

    /// Decide how load `episode` of `asset` proceeds.
    ///
    /// A stored payload is handed over to the episode; otherwise a fetch is
    /// started that supersedes every older one. Episodes that are not newer
    /// than the last fetch or the last unload are refused.
    pub fn begin_fetch(&self, asset: &AssetId, episode: LoadEpisode) -> FetchStart {
        let mut maps = self.inner.maps.write();
        let maps = &mut *maps;
        let marks = maps.marks.entry(asset.clone()).or_default();

        if !marks.admits(episode) {
            return FetchStart::Superseded;
        }
        marks.newest_fetch = episode;

        match maps.payloads.get_mut(asset) {
            Some(stored) => {
                stored.episode = episode;
                FetchStart::Resident
            }
            None => FetchStart::Fetch(FetchToken(episode)),
        }
    }

    /// Store the result of a fetch.
    ///
    /// Returns false (and stores nothing) when the fetch was superseded or
    /// its episode was unloaded while it ran.
    pub fn finish_fetch(&self, asset: &AssetId, token: FetchToken, bytes: Vec<u8>) -> bool {
        let mut maps = self.inner.maps.write();

        let current = maps.marks.get(asset).is_some_and(|marks| {
            marks.newest_fetch == token.0 && marks.unloaded_through < token.0
        });
        if !current {
            return false;
        }

        self.store_locked(&mut maps, asset.clone(), bytes.into(), token.0);
        true
    }

    /// Insert a payload directly.
    ///
    /// The payload belongs to no episode yet; the next load of `asset`
    /// adopts it.
    pub fn insert(&self, asset: AssetId, bytes: impl Into<Arc<[u8]>>) {
        let mut maps = self.inner.maps.write();
        self.store_locked(&mut maps, asset, bytes.into(), LoadEpisode::default());
    }

    fn store_locked(
        &self,
        maps: &mut StoreMaps,
        asset: AssetId,
        bytes: Arc<[u8]>,
        episode: LoadEpisode,
    ) {
        let size = bytes.len();
        let previous = maps
            .payloads
            .insert(asset, StoredPayload { bytes, episode });

        self.inner.current_memory.fetch_add(size, Ordering::SeqCst);
        if let Some(previous) = previous {
            self.inner
                .current_memory
                .fetch_sub(previous.bytes.len(), Ordering::SeqCst);
        }
    }

    /// Drop the store's hold on `asset`, cancelling any fetch in flight
    pub fn evict(&self, asset: &AssetId) -> bool {
        let mut maps = self.inner.maps.write();
        if let Some(marks) = maps.marks.get_mut(asset) {
            marks.unloaded_through = marks.unloaded_through.max(marks.newest_fetch);
        }
        self.remove_locked(&mut maps, asset)
    }

    /// Drop what `episode` and older episodes of `asset` hold.
    ///
    /// A payload or fetch of a newer episode survives. Fetches of the
    /// unloaded episodes that have not started yet are refused when they do.
    pub fn evict_through(&self, asset: &AssetId, episode: LoadEpisode) -> bool {
        let mut maps = self.inner.maps.write();
        let marks = maps.marks.entry(asset.clone()).or_default();
        marks.unloaded_through = marks.unloaded_through.max(episode);

        let owned = maps
            .payloads
            .get(asset)
            .is_some_and(|stored| stored.episode <= episode);
        owned && self.remove_locked(&mut maps, asset)
    }

    fn remove_locked(&self, maps: &mut StoreMaps, asset: &AssetId) -> bool {
        match maps.payloads.remove(asset) {
            Some(removed) => {
                self.inner
                    .current_memory
                    .fetch_sub(removed.bytes.len(), Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Clears all stored payloads and cancels fetches in flight
    pub fn clear(&self) {
        let mut maps = self.inner.maps.write();
        maps.payloads.clear();
        for marks in maps.marks.values_mut() {
            marks.unloaded_through = marks.unloaded_through.max(marks.newest_fetch);
        }
        self.inner.current_memory.store(0, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for AssetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetStore")
            .field("payloads", &self.len())
            .field("memory_usage", &self.memory_usage())
            .finish()
    }
}
