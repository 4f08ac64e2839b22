//! RAII request guard

use std::fmt;
use std::sync::{Arc, Weak};

use super::RequestRegistry;
use crate::callback::SharedCallback;
use crate::error::{RegistryError, Result};
use crate::id::{AssetId, RequestId};
use crate::loader::AsyncLoader;

/// A request that is released when the guard is dropped
///
/// The guard holds the registry weakly. If the registry has already been
/// torn down the drop does nothing, which makes it safe to keep guards in
/// objects that outlive the registry.
pub struct ScopedRequest<L: AsyncLoader> {
    registry: Weak<RequestRegistry<L>>,
    id: RequestId,
}

impl<L: AsyncLoader> ScopedRequest<L> {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Whether the underlying request is still outstanding
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.is_request_valid(self.id))
    }

    /// Release now and report the outcome
    pub fn release(mut self) -> Result<()> {
        let id = std::mem::take(&mut self.id);
        match self.registry.upgrade() {
            Some(registry) => registry.release_assets(id),
            None => Err(RegistryError::UnknownRequest(id)),
        }
    }

    /// Detach the guard, leaving the request outstanding
    pub fn into_request_id(mut self) -> RequestId {
        std::mem::take(&mut self.id)
    }
}

impl<L: AsyncLoader> Drop for ScopedRequest<L> {
    fn drop(&mut self) {
        if !self.id.is_valid() {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            // Already released elsewhere is fine here
            let _ = registry.release_assets(self.id);
        }
    }
}

impl<L: AsyncLoader> fmt::Debug for ScopedRequest<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedRequest").field("id", &self.id).finish()
    }
}

impl<L: AsyncLoader> RequestRegistry<L> {
    /// Like [`request_assets`](Self::request_assets), but the request is tied
    /// to the returned guard
    pub fn request_scoped<I>(
        self: &Arc<Self>,
        assets: I,
        callback: Option<SharedCallback>,
    ) -> Result<ScopedRequest<L>>
    where
        I: IntoIterator,
        I::Item: Into<AssetId>,
    {
        let id = self.request_assets(assets, callback)?;
        Ok(ScopedRequest {
            registry: Arc::downgrade(self),
            id,
        })
    }
}
