//! Error types for archetype_streamable

use crate::id::{AssetId, RequestId};
use thiserror::Error;

/// Main error type for registry operations
///
/// Every variant is recoverable. Nothing the registry detects is raised as a
/// panic, so callers racing teardown can always probe and release safely.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid asset: {0}")]
    InvalidAsset(AssetId),

    #[error("Unknown request: {0}")]
    UnknownRequest(RequestId),

    #[error("Asset failed to load: {0}")]
    LoadFailed(AssetId),

    #[error("Request contains no assets")]
    EmptyRequest,

    #[error("Request covers {requested} assets, limit is {limit}")]
    TooManyAssets { requested: usize, limit: usize },

    #[error("Registry is not running")]
    NotRunning,
}

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
