//! Request-scoped reference counting over an async loader
//!
//! The registry maps every outstanding [`RequestId`] to the assets it covers
//! and every covered [`AssetId`] to a reference count and load state. Loads
//! are deduplicated: however many requests name an asset while it is in
//! flight, the loader sees a single `begin_load`. When the last request
//! naming an asset is released the loader is told to unload it.
//!
//! All bookkeeping sits behind one mutex. The loader and callbacks are always
//! invoked after that lock is released, so both may call back into the
//! registry.

mod completion;
mod entry;
pub mod metrics;
mod scoped;

pub use completion::LoadCompletion;
pub use entry::AssetState;
pub use scoped::ScopedRequest;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::callback::{notify, FnCallback, LoadOutcome, SharedCallback};
use crate::config::{FailurePolicy, RegistryConfig};
use crate::error::{RegistryError, Result};
use crate::id::{AssetId, LoadEpisode, RequestId};
use crate::loader::AsyncLoader;
use entry::{AssetEntry, PendingCallback, RequestEntry};
use metrics::RegistryMetricsHandle;

/// Mutable registry state, only touched under [`Shared::state`]
struct RegistryState {
    running: bool,
    next_request: u64,
    next_episode: u64,
    assets: HashMap<AssetId, AssetEntry>,
    requests: BTreeMap<RequestId, RequestEntry>,
}

impl RegistryState {
    fn new() -> Self {
        Self {
            running: true,
            next_request: 1,
            next_episode: 1,
            assets: HashMap::new(),
            requests: BTreeMap::new(),
        }
    }

    fn mint_request(&mut self) -> RequestId {
        let id = RequestId::from_raw(self.next_request);
        self.next_request += 1;
        id
    }

    /// Drop one request's hold on its assets.
    ///
    /// Returns the assets whose count reached zero, each with the last load
    /// episode it had; their entries are gone.
    /// Callbacks detached along the way are moved into `detached` so the
    /// caller can drop them once the lock is released.
    fn release_entry(
        &mut self,
        request: RequestId,
        entry: RequestEntry,
        detached: &mut Vec<PendingCallback>,
    ) -> Vec<(AssetId, LoadEpisode)> {
        let mut orphaned = Vec::new();

        for asset in entry.assets {
            let Some(tracked) = self.assets.get_mut(&asset) else {
                log::error!("Request {request} references untracked asset {asset}");
                continue;
            };

            detached.extend(tracked.forget_request(request));
            tracked.reference_count = tracked.reference_count.saturating_sub(1);

            if tracked.reference_count == 0 {
                if let Some(removed) = self.assets.remove(&asset) {
                    detached.extend(removed.pending);
                    orphaned.push((asset, LoadEpisode::from_raw(removed.episode)));
                }
            }
        }

        orphaned
    }
}

/// State shared between the registry and outstanding [`LoadCompletion`]s
pub(crate) struct Shared {
    state: Mutex<RegistryState>,
    config: RegistryConfig,
    metrics: RegistryMetricsHandle,
}

impl Shared {
    /// Apply a loader's completion report and fan it out to waiting callbacks
    fn complete(&self, asset: &AssetId, episode: u64, success: bool) {
        let (waiting, outcome, deliver) = {
            let mut state = self.state.lock();

            let Some(entry) = state.assets.get_mut(asset) else {
                log::debug!("Ignoring completion for {asset}: no longer requested");
                return;
            };

            if !entry.accepts_completion(episode) {
                log::debug!("Ignoring stale completion for {asset} (episode {episode})");
                return;
            }

            let elapsed = entry.load_started.take().map(|started| started.elapsed());
            let waiting = std::mem::take(&mut entry.pending);

            if success {
                entry.state = AssetState::Loaded;
                self.metrics.record_load_completed(asset, elapsed);
                log::debug!("Loaded {asset}, notifying {} callbacks", waiting.len());
                (waiting, LoadOutcome::Loaded { already_loaded: false }, true)
            } else {
                entry.state = AssetState::Unloaded;
                self.metrics.record_load_failed();
                log::warn!("Failed to load {asset}");
                let deliver = self.config.failure_policy == FailurePolicy::Notify;
                (waiting, LoadOutcome::Failed, deliver)
            }
        };

        if !deliver {
            return;
        }
        for pending in waiting {
            notify(&*pending.callback, asset, outcome);
        }
    }
}

/// Reference-counting façade over an [`AsyncLoader`]
///
/// # Example
/// ```
/// use archetype_streamable::{MockLoader, RequestRegistry, RegistryConfig};
///
/// let loader = MockLoader::new();
/// let registry = RequestRegistry::new(loader.clone(), RegistryConfig::default());
///
/// let request = registry.request_assets(["meshes/rock.glb"], None).unwrap();
/// loader.complete("meshes/rock.glb");
/// assert!(registry.is_loaded(&"meshes/rock.glb".into()));
///
/// registry.release_assets(request).unwrap();
/// assert_eq!(loader.unload_calls().len(), 1);
/// ```
pub struct RequestRegistry<L: AsyncLoader> {
    shared: Arc<Shared>,
    loader: L,
}

impl<L: AsyncLoader> RequestRegistry<L> {
    /// Create a running registry over `loader`
    pub fn new(loader: L, config: RegistryConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(RegistryState::new()),
                config,
                metrics: RegistryMetricsHandle::new(),
            }),
            loader,
        }
    }

    /// Create a running registry with the default configuration
    pub fn with_loader(loader: L) -> Self {
        Self::new(loader, RegistryConfig::default())
    }

    /// Request a set of assets.
    ///
    /// Duplicate ids are collapsed. The call is all-or-nothing: if any asset
    /// fails to resolve nothing is retained and `InvalidAsset` is returned.
    /// When `callback` is given it is told about every asset exactly once,
    /// immediately (before this returns) for assets that are already loaded.
    pub fn request_assets<I>(&self, assets: I, callback: Option<SharedCallback>) -> Result<RequestId>
    where
        I: IntoIterator,
        I::Item: Into<AssetId>,
    {
        let assets = self.validate(assets).inspect_err(|_| {
            self.shared.metrics.record_rejected_request();
        })?;

        let mut to_load = Vec::new();
        let mut immediate = Vec::new();

        let request = {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;

            if !state.running {
                self.shared.metrics.record_rejected_request();
                return Err(RegistryError::NotRunning);
            }

            let request = state.mint_request();

            for asset in &assets {
                let entry = state
                    .assets
                    .entry(asset.clone())
                    .or_insert_with(AssetEntry::new);
                entry.reference_count += 1;

                if entry.state == AssetState::Unloaded {
                    let episode = state.next_episode;
                    state.next_episode += 1;
                    entry.begin_episode(episode);
                    to_load.push(LoadCompletion::new(
                        Arc::downgrade(&self.shared),
                        asset.clone(),
                        episode,
                    ));
                }

                if entry.state == AssetState::Loaded {
                    self.shared.metrics.record_immediate_hit();
                    if callback.is_some() {
                        immediate.push(asset.clone());
                    }
                } else if let Some(callback) = &callback {
                    entry.pending.push(PendingCallback {
                        request,
                        callback: Arc::clone(callback),
                    });
                }
            }

            state.requests.insert(
                request,
                RequestEntry {
                    assets: assets.clone(),
                },
            );
            request
        };

        self.shared.metrics.record_request();
        log::debug!(
            "Request {request} holds {} assets ({} new loads)",
            assets.len(),
            to_load.len()
        );

        for completion in to_load {
            let asset = completion.asset().clone();
            log::debug!("Begin load {asset}");
            self.shared.metrics.record_load_started();
            self.loader.begin_load(&asset, completion);
        }

        if let Some(callback) = &callback {
            for asset in &immediate {
                callback.on_asset_loaded(asset, true);
            }
        }

        Ok(request)
    }

    /// Request a single asset
    pub fn request_asset(
        &self,
        asset: impl Into<AssetId>,
        callback: Option<SharedCallback>,
    ) -> Result<RequestId> {
        self.request_assets(std::iter::once(asset.into()), callback)
    }

    /// Request assets and receive completions through a closure
    pub fn request_assets_with<I, F>(&self, assets: I, on_complete: F) -> Result<RequestId>
    where
        I: IntoIterator,
        I::Item: Into<AssetId>,
        F: Fn(&AssetId, LoadOutcome) + Send + Sync + 'static,
    {
        self.request_assets(assets, Some(FnCallback::shared(on_complete)))
    }

    /// Release a request's hold on its assets.
    ///
    /// Assets no longer held by any request are unloaded. Unload is only a
    /// hint to the loader; memory may be reclaimed later. Unknown or invalid
    /// ids return `UnknownRequest` and change nothing.
    pub fn release_assets(&self, request: RequestId) -> Result<()> {
        let mut detached = Vec::new();
        let orphaned = {
            let mut state = self.shared.state.lock();

            let Some(entry) = state.requests.remove(&request) else {
                self.shared.metrics.record_unknown_release();
                if self.shared.config.log_unknown_releases {
                    log::warn!("Release of unknown request {request}");
                }
                return Err(RegistryError::UnknownRequest(request));
            };

            state.release_entry(request, entry, &mut detached)
        };
        drop(detached);

        self.shared.metrics.record_release();
        log::debug!("Released request {request}, unloading {}", orphaned.len());
        self.unload_all(orphaned);
        Ok(())
    }

    /// Re-enable a stopped registry
    pub fn start(&self) {
        let mut state = self.shared.state.lock();
        if !state.running {
            log::debug!("Registry started");
            state.running = true;
        }
    }

    /// Force-release every outstanding request and refuse new ones.
    ///
    /// Requests are released oldest first. Returns how many were released.
    pub fn stop(&self) -> usize {
        let mut detached = Vec::new();
        let (released, orphaned) = {
            let mut state = self.shared.state.lock();
            state.running = false;

            let requests = std::mem::take(&mut state.requests);
            let released = requests.len();
            let mut orphaned = Vec::new();
            for (request, entry) in requests {
                orphaned.extend(state.release_entry(request, entry, &mut detached));
                self.shared.metrics.record_release();
            }
            debug_assert!(state.assets.is_empty());
            (released, orphaned)
        };
        drop(detached);

        if released > 0 {
            log::debug!("Registry stopped, force-released {released} requests");
        }
        self.unload_all(orphaned);
        released
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Whether `request` is currently outstanding
    pub fn is_request_valid(&self, request: RequestId) -> bool {
        request.is_valid() && self.shared.state.lock().requests.contains_key(&request)
    }

    /// Assets held by an outstanding request, in request order
    pub fn request_assets_of(&self, request: RequestId) -> Option<Vec<AssetId>> {
        self.shared
            .state
            .lock()
            .requests
            .get(&request)
            .map(|entry| entry.assets.clone())
    }

    /// Number of outstanding requests holding `asset` (0 if untracked)
    pub fn reference_count(&self, asset: &AssetId) -> u32 {
        self.shared
            .state
            .lock()
            .assets
            .get(asset)
            .map_or(0, |entry| entry.reference_count)
    }

    pub fn asset_state(&self, asset: &AssetId) -> Option<AssetState> {
        self.shared
            .state
            .lock()
            .assets
            .get(asset)
            .map(|entry| entry.state)
    }

    pub fn is_loaded(&self, asset: &AssetId) -> bool {
        self.asset_state(asset) == Some(AssetState::Loaded)
    }

    pub fn tracked_asset_count(&self) -> usize {
        self.shared.state.lock().assets.len()
    }

    pub fn outstanding_request_count(&self) -> usize {
        self.shared.state.lock().requests.len()
    }

    /// Outstanding requests, oldest first
    pub fn outstanding_requests(&self) -> Vec<RequestId> {
        self.shared.state.lock().requests.keys().copied().collect()
    }

    /// Get a reference to the metrics handle
    pub fn metrics(&self) -> &RegistryMetricsHandle {
        &self.shared.metrics
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.shared.config
    }

    /// Get a reference to the loader
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Collapse duplicates and check the request against config and loader
    fn validate<I>(&self, assets: I) -> Result<Vec<AssetId>>
    where
        I: IntoIterator,
        I::Item: Into<AssetId>,
    {
        let mut seen = HashSet::new();
        let assets: Vec<AssetId> = assets
            .into_iter()
            .map(Into::into)
            .filter(|asset| seen.insert(asset.clone()))
            .collect();

        if assets.is_empty() {
            return Err(RegistryError::EmptyRequest);
        }

        if let Some(limit) = self.shared.config.max_assets_per_request {
            if assets.len() > limit {
                return Err(RegistryError::TooManyAssets {
                    requested: assets.len(),
                    limit,
                });
            }
        }

        if let Some(invalid) = assets.iter().find(|asset| !self.loader.resolve(asset)) {
            log::warn!("Rejecting request: cannot resolve {invalid}");
            return Err(RegistryError::InvalidAsset(invalid.clone()));
        }

        Ok(assets)
    }

    fn unload_all(&self, assets: Vec<(AssetId, LoadEpisode)>) {
        for (asset, episode) in assets {
            log::debug!("Unload {asset} ({episode})");
            self.shared.metrics.record_unload();
            self.loader.unload_episode(&asset, episode);
        }
    }
}

impl<L: AsyncLoader> Drop for RequestRegistry<L> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::mock::MockLoader;

    type Log = Arc<Mutex<Vec<(AssetId, LoadOutcome)>>>;

    fn recorder() -> (Log, SharedCallback) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let callback = FnCallback::shared(move |asset: &AssetId, outcome| {
            sink.lock().push((asset.clone(), outcome));
        });
        (log, callback)
    }

    fn id(path: &str) -> AssetId {
        AssetId::new(path)
    }

    #[test]
    fn test_request_starts_one_load_per_asset() {
        let loader = MockLoader::new();
        let registry = RequestRegistry::with_loader(loader.clone());

        let request = registry.request_assets(["a", "b", "a"], None).unwrap();

        assert!(request.is_valid());
        assert_eq!(loader.begin_load_count(&id("a")), 1);
        assert_eq!(loader.begin_load_count(&id("b")), 1);
        assert_eq!(registry.reference_count(&id("a")), 1);
        assert_eq!(registry.asset_state(&id("a")), Some(AssetState::Loading));
        assert_eq!(
            registry.request_assets_of(request),
            Some(vec![id("a"), id("b")])
        );
    }

    #[test]
    fn test_loading_asset_is_deduplicated() {
        let loader = MockLoader::new();
        let registry = RequestRegistry::with_loader(loader.clone());

        registry.request_asset("a", None).unwrap();
        registry.request_asset("a", None).unwrap();

        assert_eq!(loader.begin_load_count(&id("a")), 1);
        assert_eq!(registry.reference_count(&id("a")), 2);
    }

    #[test]
    fn test_invalid_asset_rejects_whole_request() {
        let loader = MockLoader::new();
        loader.mark_invalid("broken");
        let registry = RequestRegistry::with_loader(loader.clone());

        let err = registry.request_assets(["a", "broken"], None).unwrap_err();

        assert_eq!(err, RegistryError::InvalidAsset(id("broken")));
        assert_eq!(registry.tracked_asset_count(), 0);
        assert_eq!(registry.outstanding_request_count(), 0);
        assert!(loader.begin_load_calls().is_empty());
        assert_eq!(registry.metrics().rejected_requests(), 1);
    }

    #[test]
    fn test_empty_and_oversized_requests() {
        let registry = RequestRegistry::new(
            MockLoader::new(),
            RegistryConfig::new().with_max_assets_per_request(2),
        );

        let empty: [&str; 0] = [];
        assert_eq!(
            registry.request_assets(empty, None),
            Err(RegistryError::EmptyRequest)
        );
        assert_eq!(
            registry.request_assets(["a", "b", "c"], None),
            Err(RegistryError::TooManyAssets {
                requested: 3,
                limit: 2
            })
        );
        assert!(registry.request_assets(["a", "b", "b"], None).is_ok());
    }

    #[test]
    fn test_completion_notifies_in_registration_order() {
        let loader = MockLoader::new();
        let registry = RequestRegistry::with_loader(loader.clone());
        let (log, cb1) = recorder();
        let cb2 = {
            let sink = Arc::clone(&log);
            FnCallback::shared(move |asset: &AssetId, outcome| {
                sink.lock().push((AssetId::new(format!("second:{asset}")), outcome));
            })
        };

        registry.request_asset("a", Some(cb1)).unwrap();
        registry.request_asset("a", Some(cb2)).unwrap();
        loader.complete("a");

        let log = log.lock();
        let loaded = LoadOutcome::Loaded {
            already_loaded: false,
        };
        assert_eq!(*log, vec![(id("a"), loaded), (id("second:a"), loaded)]);
        assert!(registry.is_loaded(&id("a")));
    }

    #[test]
    fn test_loaded_asset_notifies_synchronously() {
        let loader = MockLoader::new();
        let registry = RequestRegistry::with_loader(loader.clone());
        registry.request_asset("a", None).unwrap();
        loader.complete("a");

        let (log, callback) = recorder();
        registry.request_asset("a", Some(callback)).unwrap();

        assert_eq!(
            *log.lock(),
            vec![(id("a"), LoadOutcome::Loaded { already_loaded: true })]
        );
        assert_eq!(loader.begin_load_count(&id("a")), 1);
        assert_eq!(registry.metrics().immediate_hits(), 1);
    }

    #[test]
    fn test_loader_cached_asset_is_loaded_on_return() {
        let loader = MockLoader::new();
        loader.mark_cached("a");
        let registry = RequestRegistry::with_loader(loader.clone());
        let (log, callback) = recorder();

        registry.request_asset("a", Some(callback)).unwrap();

        // The registry itself had nothing loaded, so this is a fresh load
        assert!(registry.is_loaded(&id("a")));
        assert_eq!(
            *log.lock(),
            vec![(id("a"), LoadOutcome::Loaded { already_loaded: false })]
        );
        assert_eq!(registry.metrics().immediate_hits(), 0);
        assert_eq!(registry.metrics().loads_completed(), 1);
    }

    #[test]
    fn test_release_unloads_only_last_reference() {
        let loader = MockLoader::new();
        let registry = RequestRegistry::with_loader(loader.clone());

        let r1 = registry.request_assets(["a", "b"], None).unwrap();
        let r2 = registry.request_asset("a", None).unwrap();

        registry.release_assets(r1).unwrap();
        assert_eq!(loader.unload_calls(), vec![id("b")]);
        assert_eq!(registry.reference_count(&id("a")), 1);
        assert_eq!(registry.asset_state(&id("b")), None);

        registry.release_assets(r2).unwrap();
        assert_eq!(loader.unload_calls(), vec![id("b"), id("a")]);
        assert_eq!(registry.tracked_asset_count(), 0);
    }

    #[test]
    fn test_unknown_release_changes_nothing() {
        let loader = MockLoader::new();
        let registry = RequestRegistry::with_loader(loader.clone());
        let request = registry.request_asset("a", None).unwrap();

        assert_eq!(
            registry.release_assets(RequestId::INVALID),
            Err(RegistryError::UnknownRequest(RequestId::INVALID))
        );
        let stale = RequestId::from_raw(request.as_u64() + 100);
        assert_eq!(
            registry.release_assets(stale),
            Err(RegistryError::UnknownRequest(stale))
        );

        assert_eq!(registry.reference_count(&id("a")), 1);
        assert!(loader.unload_calls().is_empty());
        assert_eq!(registry.metrics().unknown_releases(), 2);

        registry.release_assets(request).unwrap();
        assert!(registry.release_assets(request).is_err());
    }

    #[test]
    fn test_release_during_load_drops_callback() {
        let loader = MockLoader::new();
        let registry = RequestRegistry::with_loader(loader.clone());
        let (early, cb1) = recorder();
        let (late, cb2) = recorder();

        let r1 = registry.request_asset("a", Some(cb1)).unwrap();
        registry.request_asset("a", Some(cb2)).unwrap();
        registry.release_assets(r1).unwrap();
        loader.complete("a");

        assert!(early.lock().is_empty());
        assert_eq!(late.lock().len(), 1);
        assert!(loader.unload_calls().is_empty());
    }

    #[test]
    fn test_completion_after_full_release_is_ignored() {
        let loader = MockLoader::new();
        let registry = RequestRegistry::with_loader(loader.clone());
        let (log, callback) = recorder();

        let request = registry.request_asset("a", Some(callback)).unwrap();
        registry.release_assets(request).unwrap();
        loader.complete("a");

        assert!(log.lock().is_empty());
        assert_eq!(registry.tracked_asset_count(), 0);
    }

    #[test]
    fn test_stale_episode_does_not_complete_new_load() {
        let loader = MockLoader::new();
        let registry = RequestRegistry::with_loader(loader.clone());

        let first = registry.request_asset("a", None).unwrap();
        let stale = loader.take_pending(&id("a")).unwrap();
        registry.release_assets(first).unwrap();

        registry.request_asset("a", None).unwrap();
        stale.succeed();

        assert_eq!(registry.asset_state(&id("a")), Some(AssetState::Loading));
        loader.complete("a");
        assert!(registry.is_loaded(&id("a")));
        assert_eq!(loader.begin_load_count(&id("a")), 2);
    }

    #[test]
    fn test_failure_notifies_and_allows_retry() {
        let loader = MockLoader::new();
        let registry = RequestRegistry::with_loader(loader.clone());
        let (log, callback) = recorder();

        registry.request_asset("a", Some(callback)).unwrap();
        loader.fail("a");

        assert_eq!(*log.lock(), vec![(id("a"), LoadOutcome::Failed)]);
        assert_eq!(registry.asset_state(&id("a")), Some(AssetState::Unloaded));
        assert_eq!(registry.reference_count(&id("a")), 1);

        registry.request_asset("a", None).unwrap();
        assert_eq!(loader.begin_load_count(&id("a")), 2);
        assert_eq!(registry.metrics().loads_failed(), 1);
    }

    #[test]
    fn test_failure_policy_drop_is_silent() {
        let loader = MockLoader::new();
        let registry = RequestRegistry::new(
            loader.clone(),
            RegistryConfig::new().with_failure_policy(FailurePolicy::Drop),
        );
        let (log, callback) = recorder();

        registry.request_asset("a", Some(callback)).unwrap();
        loader.fail("a");

        assert!(log.lock().is_empty());
        assert_eq!(registry.asset_state(&id("a")), Some(AssetState::Unloaded));
    }

    #[test]
    fn test_stop_force_releases_and_refuses() {
        let loader = MockLoader::new();
        let registry = RequestRegistry::with_loader(loader.clone());
        let request = registry.request_assets(["a", "b"], None).unwrap();
        registry.request_asset("a", None).unwrap();

        assert_eq!(registry.stop(), 2);
        assert!(!registry.is_running());
        assert_eq!(registry.tracked_asset_count(), 0);
        assert_eq!(loader.unload_calls().len(), 2);
        assert_eq!(
            registry.request_asset("a", None),
            Err(RegistryError::NotRunning)
        );
        assert_eq!(
            registry.release_assets(request),
            Err(RegistryError::UnknownRequest(request))
        );

        registry.start();
        assert!(registry.request_asset("a", None).is_ok());
    }

    #[test]
    fn test_drop_unloads_outstanding_assets() {
        let loader = MockLoader::new();
        {
            let registry = RequestRegistry::with_loader(loader.clone());
            registry.request_assets(["a", "b"], None).unwrap();
        }
        let mut unloaded = loader.unload_calls();
        unloaded.sort();
        assert_eq!(unloaded, vec![id("a"), id("b")]);
    }

    #[test]
    fn test_callback_may_reenter_registry() {
        let loader = MockLoader::new();
        let registry = Arc::new(RequestRegistry::with_loader(loader.clone()));
        let inner = Arc::clone(&registry);
        let nested = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&nested);

        registry
            .request_assets_with(["a"], move |_asset: &AssetId, _outcome| {
                *slot.lock() = Some(inner.request_asset("b", None).unwrap());
            })
            .unwrap();
        loader.complete("a");

        assert!(nested.lock().is_some());
        assert_eq!(registry.reference_count(&AssetId::new("b")), 1);
    }

    #[test]
    fn test_request_ids_are_unique_and_increasing() {
        let registry = RequestRegistry::with_loader(MockLoader::new());
        let r1 = registry.request_asset("a", None).unwrap();
        let r2 = registry.request_asset("a", None).unwrap();
        registry.release_assets(r1).unwrap();
        let r3 = registry.request_asset("a", None).unwrap();

        assert!(r1 < r2 && r2 < r3);
        assert_eq!(registry.outstanding_requests(), vec![r2, r3]);
        assert!(!registry.is_request_valid(r1));
        assert!(registry.is_request_valid(r3));
    }

    type Hook = Box<dyn FnOnce() + Send>;

    /// Runs a hook inside the first `begin_load`, before the mock sees it
    struct Reentrant {
        inner: MockLoader,
        hook: Mutex<Option<Hook>>,
    }

    impl AsyncLoader for Reentrant {
        fn begin_load(&self, asset: &AssetId, completion: LoadCompletion) {
            let hook = self.hook.lock().take();
            if let Some(hook) = hook {
                hook();
            }
            self.inner.begin_load(asset, completion)
        }

        fn unload(&self, asset: &AssetId) {
            self.inner.unload(asset)
        }
    }

    #[test]
    fn test_rerequest_before_first_begin_load_arrives() {
        let loader = MockLoader::new();
        let registry = Arc::new(RequestRegistry::with_loader(Reentrant {
            inner: loader.clone(),
            hook: Mutex::new(None),
        }));
        let (log, callback) = recorder();
        let second = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&registry);
        let slot = Arc::clone(&second);
        *registry.loader().hook.lock() = Some(Box::new(move || {
            let registry = weak.upgrade().unwrap();
            let first = registry.outstanding_requests()[0];
            registry.release_assets(first).unwrap();
            *slot.lock() = Some(registry.request_asset("a", Some(callback)).unwrap());
        }));

        let first = registry.request_asset("a", None).unwrap();
        let second = (*second.lock()).unwrap();

        // The newer load reached the mock first; the late one is stale
        assert_eq!(loader.begin_load_count(&id("a")), 2);
        assert_eq!(loader.unload_calls(), vec![id("a")]);
        assert!(!registry.is_request_valid(first));
        assert_eq!(registry.outstanding_requests(), vec![second]);

        assert!(loader.complete("a"));
        assert!(registry.is_loaded(&id("a")));
        assert!(loader.complete("a"));
        assert!(registry.is_loaded(&id("a")));

        assert_eq!(registry.reference_count(&id("a")), 1);
        assert_eq!(
            *log.lock(),
            vec![(id("a"), LoadOutcome::Loaded { already_loaded: false })]
        );
        assert_eq!(registry.metrics().loads_completed(), 1);
    }
}
