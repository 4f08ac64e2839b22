//! Bookkeeping records owned by the registry

use std::time::Instant;

use crate::callback::SharedCallback;
use crate::id::{AssetId, RequestId};

/// Load state of a tracked asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetState {
    /// Known but not loading, either fresh or after a failed load
    Unloaded,
    /// A load is in flight
    Loading,
    /// The loader reported the asset as available
    Loaded,
}

/// A callback waiting on an asset, tagged with the request that owns it
pub(crate) struct PendingCallback {
    pub request: RequestId,
    pub callback: SharedCallback,
}

/// Per-asset record
pub(crate) struct AssetEntry {
    pub reference_count: u32,
    pub state: AssetState,
    /// Callbacks in registration order
    pub pending: Vec<PendingCallback>,
    /// Id of the current (or last) loading episode
    pub episode: u64,
    pub load_started: Option<Instant>,
}

impl AssetEntry {
    pub fn new() -> Self {
        Self {
            reference_count: 0,
            state: AssetState::Unloaded,
            pending: Vec::new(),
            episode: 0,
            load_started: None,
        }
    }

    /// Unloaded -> Loading
    pub fn begin_episode(&mut self, episode: u64) {
        debug_assert_eq!(self.state, AssetState::Unloaded);
        self.state = AssetState::Loading;
        self.episode = episode;
        self.load_started = Some(Instant::now());
    }

    /// Whether a completion for `episode` still applies to this entry
    pub fn accepts_completion(&self, episode: u64) -> bool {
        self.state == AssetState::Loading && self.episode == episode
    }

    /// Detach every callback registered by `request`, keeping the rest in order
    pub fn forget_request(&mut self, request: RequestId) -> Vec<PendingCallback> {
        let (forgotten, kept) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|pending| pending.request == request);
        self.pending = kept;
        forgotten
    }
}

/// Per-request record
pub(crate) struct RequestEntry {
    /// Distinct assets, in the order they were requested
    pub assets: Vec<AssetId>,
}
