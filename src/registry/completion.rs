//! Completion handle handed to loaders

use std::fmt;
use std::sync::Weak;

use super::Shared;
use crate::id::{AssetId, LoadEpisode};

/// One-shot token a loader uses to report the end of a load
///
/// Created by the registry for every `begin_load` call. Consuming it with
/// [`succeed`](Self::succeed) or [`fail`](Self::fail) re-enters the registry.
/// The token only holds a weak reference, so completing after the registry
/// is gone does nothing. Dropping it without completing leaves the asset
/// loading.
pub struct LoadCompletion {
    shared: Weak<Shared>,
    asset: AssetId,
    episode: u64,
}

impl LoadCompletion {
    pub(crate) fn new(shared: Weak<Shared>, asset: AssetId, episode: u64) -> Self {
        Self {
            shared,
            asset,
            episode,
        }
    }

    /// The asset this completion belongs to
    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    /// The load episode this completion reports on
    pub fn episode(&self) -> LoadEpisode {
        LoadEpisode::from_raw(self.episode)
    }

    /// Whether the registry that issued this completion still exists
    pub fn is_registry_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }

    /// Report the outcome of the load
    pub fn complete(self, success: bool) {
        match self.shared.upgrade() {
            Some(shared) => shared.complete(&self.asset, self.episode, success),
            None => log::debug!(
                "Dropping completion for {}: registry no longer exists",
                self.asset
            ),
        }
    }

    pub fn succeed(self) {
        self.complete(true)
    }

    pub fn fail(self) {
        self.complete(false)
    }
}

impl fmt::Debug for LoadCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadCompletion")
            .field("asset", &self.asset)
            .field("episode", &self.episode)
            .finish()
    }
}
