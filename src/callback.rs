//! Completion callbacks
//!
//! A callback is attached to a request and is told, per asset, when that
//! asset becomes available (or fails to).

use crate::error::{RegistryError, Result};
use crate::id::AssetId;
use std::fmt;
use std::sync::Arc;

/// Result of a load as reported to a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The asset is available. `already_loaded` is true when it was loaded
    /// before the request was made and the notification was immediate.
    Loaded { already_loaded: bool },

    /// The loader reported a failure for this asset
    Failed,
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }

    /// `Ok(already_loaded)` on success, `LoadFailed` otherwise
    pub fn into_result(self, asset: &AssetId) -> Result<bool> {
        match self {
            LoadOutcome::Loaded { already_loaded } => Ok(already_loaded),
            LoadOutcome::Failed => Err(RegistryError::LoadFailed(asset.clone())),
        }
    }
}

/// Receiver for per-asset completion notifications
pub trait LoadCallback: Send + Sync {
    /// Called once per requested asset when it is available
    fn on_asset_loaded(&self, asset: &AssetId, already_loaded: bool);

    /// Called when the loader reports a failure for a requested asset
    fn on_asset_load_failed(&self, _asset: &AssetId) {}
}

/// Shared, type-erased callback as stored by the registry
pub type SharedCallback = Arc<dyn LoadCallback>;

/// Adapts a closure into a [`LoadCallback`]
pub struct FnCallback<F> {
    func: F,
}

impl<F> FnCallback<F>
where
    F: Fn(&AssetId, LoadOutcome) + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }

    /// Wrap the closure straight into a [`SharedCallback`]
    pub fn shared(func: F) -> SharedCallback {
        Arc::new(Self::new(func))
    }
}

impl<F> LoadCallback for FnCallback<F>
where
    F: Fn(&AssetId, LoadOutcome) + Send + Sync,
{
    fn on_asset_loaded(&self, asset: &AssetId, already_loaded: bool) {
        (self.func)(asset, LoadOutcome::Loaded { already_loaded });
    }

    fn on_asset_load_failed(&self, asset: &AssetId) {
        (self.func)(asset, LoadOutcome::Failed);
    }
}

impl<F> fmt::Debug for FnCallback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCallback").finish_non_exhaustive()
    }
}

/// Deliver an outcome to a callback
pub(crate) fn notify(callback: &dyn LoadCallback, asset: &AssetId, outcome: LoadOutcome) {
    match outcome {
        LoadOutcome::Loaded { already_loaded } => callback.on_asset_loaded(asset, already_loaded),
        LoadOutcome::Failed => callback.on_asset_load_failed(asset),
    }
}
