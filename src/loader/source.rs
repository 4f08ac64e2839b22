//! Byte sources for the spawned loader
//!
//! A source knows where asset bytes live and how to fetch them
//! asynchronously.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use parking_lot::RwLock;

use crate::id::AssetId;

/// Trait for fetching the bytes of an asset
///
/// Uses async-trait for dyn compatibility
#[async_trait::async_trait]
pub trait AssetSource: Send + Sync + 'static {
    /// Whether `asset` can be fetched from this source
    fn exists(&self, asset: &AssetId) -> bool;

    /// Fetch the full contents of `asset`
    async fn fetch(&self, asset: &AssetId) -> anyhow::Result<Vec<u8>>;
}

/// Reads assets from files under a root directory
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    /// Create a new file source rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an asset id to a file below the root.
    ///
    /// Absolute paths and `..` components are refused so ids cannot escape
    /// the root.
    pub fn path_for(&self, asset: &AssetId) -> Option<PathBuf> {
        if asset.is_empty() {
            return None;
        }

        let relative = Path::new(asset.path());
        let contained = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));

        contained.then(|| self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl AssetSource for FileSource {
    fn exists(&self, asset: &AssetId) -> bool {
        self.path_for(asset).is_some_and(|path| path.is_file())
    }

    async fn fetch(&self, asset: &AssetId) -> anyhow::Result<Vec<u8>> {
        let path = self
            .path_for(asset)
            .ok_or_else(|| anyhow!("asset path escapes source root: {asset}"))?;

        read_file(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))
    }
}

/// Read a whole file, without blocking the runtime's workers when there is one
#[cfg(feature = "runtime-tokio")]
async fn read_file(path: &Path) -> std::io::Result<Vec<u8>> {
    if tokio::runtime::Handle::try_current().is_ok() {
        tokio::fs::read(path).await
    } else {
        std::fs::read(path)
    }
}

#[cfg(not(feature = "runtime-tokio"))]
async fn read_file(path: &Path) -> std::io::Result<Vec<u8>> {
    std::fs::read(path)
}

/// Serves assets from byte blobs registered in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    blobs: Arc<RwLock<HashMap<AssetId, Arc<[u8]>>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the contents of an asset
    pub fn insert(&self, asset: impl Into<AssetId>, bytes: impl Into<Arc<[u8]>>) {
        self.blobs.write().insert(asset.into(), bytes.into());
    }

    pub fn remove(&self, asset: &AssetId) -> bool {
        self.blobs.write().remove(asset).is_some()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

#[async_trait::async_trait]
impl AssetSource for MemorySource {
    fn exists(&self, asset: &AssetId) -> bool {
        self.blobs.read().contains_key(asset)
    }

    async fn fetch(&self, asset: &AssetId) -> anyhow::Result<Vec<u8>> {
        self.blobs
            .read()
            .get(asset)
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| anyhow!("no such asset: {asset}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_source_refuses_escaping_paths() {
        let source = FileSource::new("/data/assets");

        assert_eq!(
            source.path_for(&AssetId::new("meshes/rock.glb")),
            Some(PathBuf::from("/data/assets/meshes/rock.glb"))
        );
        assert!(source.path_for(&AssetId::new("../secret")).is_none());
        assert!(source.path_for(&AssetId::new("/etc/passwd")).is_none());
        assert!(source.path_for(&AssetId::new("")).is_none());
    }

    #[test]
    fn test_file_source_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sounds")).unwrap();
        std::fs::write(dir.path().join("sounds/step.ogg"), b"ogg").unwrap();
        let source = FileSource::new(dir.path());
        let asset = AssetId::new("sounds/step.ogg");

        assert!(source.exists(&asset));
        assert!(!source.exists(&AssetId::new("sounds/missing.ogg")));

        let bytes = futures::executor::block_on(source.fetch(&asset)).unwrap();
        assert_eq!(bytes, b"ogg");

        let missing = futures::executor::block_on(source.fetch(&AssetId::new("nope")));
        assert!(missing.is_err());
    }

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new();
        source.insert("a", vec![1u8, 2, 3]);
        let asset = AssetId::new("a");

        assert!(source.exists(&asset));
        assert_eq!(source.len(), 1);
        assert_eq!(
            futures::executor::block_on(source.fetch(&asset)).unwrap(),
            vec![1, 2, 3]
        );

        assert!(source.remove(&asset));
        assert!(source.is_empty());
        assert!(futures::executor::block_on(source.fetch(&asset)).is_err());
    }
}
