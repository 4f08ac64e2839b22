use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::id::AssetId;

/// Tracks request traffic and load activity for a registry
#[derive(Debug, Default)]
pub struct RegistryMetrics {
    load_times: RwLock<HashMap<AssetId, Duration>>,
    requests: AtomicU64,
    releases: AtomicU64,
    unknown_releases: AtomicU64,
    rejected_requests: AtomicU64,
    loads_started: AtomicU64,
    loads_completed: AtomicU64,
    loads_failed: AtomicU64,
    unloads: AtomicU64,
    immediate_hits: AtomicU64,
}

impl RegistryMetrics {
    /// Create a new instance of RegistryMetrics
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected_request(&self) {
        self.rejected_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unknown_release(&self) {
        self.unknown_releases.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_load_started(&self) {
        self.loads_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful load and how long it was in flight
    pub(crate) fn record_load_completed(&self, asset: &AssetId, duration: Option<Duration>) {
        self.loads_completed.fetch_add(1, Ordering::Relaxed);
        if let Some(duration) = duration {
            self.load_times.write().insert(asset.clone(), duration);
        }
    }

    pub(crate) fn record_load_failed(&self) {
        self.loads_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unload(&self) {
        self.unloads.fetch_add(1, Ordering::Relaxed);
    }

    /// A requested asset was already loaded and was served immediately
    pub(crate) fn record_immediate_hit(&self) {
        self.immediate_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Successful requests
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Requests rejected with an error
    pub fn rejected_requests(&self) -> u64 {
        self.rejected_requests.load(Ordering::Relaxed)
    }

    /// Releases of known requests, including forced ones at shutdown
    pub fn releases(&self) -> u64 {
        self.releases.load(Ordering::Relaxed)
    }

    pub fn unknown_releases(&self) -> u64 {
        self.unknown_releases.load(Ordering::Relaxed)
    }

    pub fn loads_started(&self) -> u64 {
        self.loads_started.load(Ordering::Relaxed)
    }

    pub fn loads_completed(&self) -> u64 {
        self.loads_completed.load(Ordering::Relaxed)
    }

    pub fn loads_failed(&self) -> u64 {
        self.loads_failed.load(Ordering::Relaxed)
    }

    pub fn unloads(&self) -> u64 {
        self.unloads.load(Ordering::Relaxed)
    }

    pub fn immediate_hits(&self) -> u64 {
        self.immediate_hits.load(Ordering::Relaxed)
    }

    /// Share of requested assets that were already loaded, as a percentage
    pub fn hit_rate(&self) -> f32 {
        let hits = self.immediate_hits() as f32;
        let loads = self.loads_started() as f32;

        if hits + loads > 0.0 {
            hits / (hits + loads) * 100.0
        } else {
            0.0
        }
    }

    /// Time the most recent load of an asset spent in flight
    pub fn last_load_time(&self, asset: &AssetId) -> Option<Duration> {
        self.load_times.read().get(asset).copied()
    }

    /// Get all recorded load times
    pub fn all_load_times(&self) -> HashMap<AssetId, Duration> {
        self.load_times.read().clone()
    }
}

/// A thread-safe wrapper around RegistryMetrics
#[derive(Debug, Clone, Default)]
pub struct RegistryMetricsHandle(Arc<RegistryMetrics>);

impl RegistryMetricsHandle {
    /// Create a new metrics handle
    pub fn new() -> Self {
        Self(Arc::new(RegistryMetrics::new()))
    }

    /// Get a reference to the underlying metrics
    pub fn inner(&self) -> &RegistryMetrics {
        &self.0
    }
}

impl std::ops::Deref for RegistryMetricsHandle {
    type Target = RegistryMetrics;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
