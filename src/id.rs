//! Asset and request identifiers

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64;

/// Stable identifier for a loadable asset
///
/// Acts as a soft reference: holding an `AssetId` never causes a load.
/// The path is shared, so clones are cheap, and its xxh3 hash is computed
/// once up front for map lookups.
#[derive(Clone)]
pub struct AssetId {
    path: Arc<str>,
    hash: u64,
}

impl AssetId {
    /// Create an identifier from a path-like string
    pub fn new(path: impl AsRef<str>) -> Self {
        let path = path.as_ref();
        Self {
            hash: xxh3_64(path.as_bytes()),
            path: Arc::from(path),
        }
    }

    /// The path this identifier refers to
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Precomputed xxh3 hash of the path
    pub fn path_hash(&self) -> u64 {
        self.hash
    }

    pub fn is_empty(&self) -> bool {
        self.path.trim().is_empty()
    }
}

impl PartialEq for AssetId {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.path == other.path
    }
}

impl Eq for AssetId {}

impl Hash for AssetId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for AssetId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AssetId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.cmp(&other.path)
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AssetId").field(&self.path).finish()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl From<&str> for AssetId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for AssetId {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl From<&String> for AssetId {
    fn from(path: &String) -> Self {
        Self::new(path)
    }
}

/// Opaque handle for one outstanding request
///
/// Minted by the registry, starting at 1. Zero is reserved as
/// [`RequestId::INVALID`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestId(u64);

impl RequestId {
    /// The "no request" sentinel
    pub const INVALID: RequestId = RequestId(0);

    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Whether this id could refer to a request at all
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Number of one `Unloaded -> Loading` transition
///
/// The registry draws episodes from a single counter, so a later load of any
/// asset always carries a larger episode than an earlier one. Loaders use it
/// to order work that reaches them out of order. Zero predates every load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LoadEpisode(u64);

impl LoadEpisode {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LoadEpisode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "episode {}", self.0)
    }
}
