//! Registry configuration

/// What happens to pending callbacks when a load fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Invoke `on_asset_load_failed` on every pending callback
    #[default]
    Notify,
    /// Discard pending callbacks without notifying them
    Drop,
}

/// Tunables for a [`RequestRegistry`](crate::RequestRegistry)
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Handling of pending callbacks on load failure
    pub failure_policy: FailurePolicy,
    /// Upper bound on distinct assets in a single request
    pub max_assets_per_request: Option<usize>,
    /// Log a warning when an unknown request is released
    pub log_unknown_releases: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Notify,
            max_assets_per_request: None,
            log_unknown_releases: true,
        }
    }
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_max_assets_per_request(mut self, limit: usize) -> Self {
        self.max_assets_per_request = Some(limit);
        self
    }

    pub fn with_unknown_release_logging(mut self, enabled: bool) -> Self {
        self.log_unknown_releases = enabled;
        self
    }
}
