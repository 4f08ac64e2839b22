//! Mock loader for testing
//!
//! Records every call the registry makes and holds completions until the
//! test decides how each load ends.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{AsyncLoader, LoadCompletion};
use crate::id::AssetId;

#[derive(Debug, Default)]
struct MockState {
    begin_loads: Vec<AssetId>,
    unloads: Vec<AssetId>,
    pending: HashMap<AssetId, VecDeque<LoadCompletion>>,
    cached: HashSet<AssetId>,
    invalid: HashSet<AssetId>,
}

/// Mock loader for testing
///
/// Clones share state, so a test can keep one handle while the registry
/// owns another.
#[derive(Clone, Debug, Default)]
pub struct MockLoader {
    state: Arc<Mutex<MockState>>,
}

impl MockLoader {
    /// Create a new mock loader that defers every load
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads of `asset` complete successfully inside `begin_load`
    pub fn mark_cached(&self, asset: impl Into<AssetId>) {
        self.state.lock().cached.insert(asset.into());
    }

    /// `asset` fails to resolve
    pub fn mark_invalid(&self, asset: impl Into<AssetId>) {
        self.state.lock().invalid.insert(asset.into());
    }

    /// Every `begin_load` call so far, in order
    pub fn begin_load_calls(&self) -> Vec<AssetId> {
        self.state.lock().begin_loads.clone()
    }

    pub fn begin_load_count(&self, asset: &AssetId) -> usize {
        self.state
            .lock()
            .begin_loads
            .iter()
            .filter(|id| *id == asset)
            .count()
    }

    /// Every `unload` call so far, in order
    pub fn unload_calls(&self) -> Vec<AssetId> {
        self.state.lock().unloads.clone()
    }

    /// Number of loads still waiting on the test
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.values().map(VecDeque::len).sum()
    }

    pub fn is_pending(&self, asset: &AssetId) -> bool {
        self.state
            .lock()
            .pending
            .get(asset)
            .is_some_and(|queue| !queue.is_empty())
    }

    /// Take the oldest pending completion for `asset` without completing it
    pub fn take_pending(&self, asset: &AssetId) -> Option<LoadCompletion> {
        let mut state = self.state.lock();
        let queue = state.pending.get_mut(asset)?;
        let completion = queue.pop_front();
        if queue.is_empty() {
            state.pending.remove(asset);
        }
        completion
    }

    /// Finish the oldest pending load of `asset` successfully
    pub fn complete(&self, asset: impl Into<AssetId>) -> bool {
        self.finish(&asset.into(), true)
    }

    /// Finish the oldest pending load of `asset` with a failure
    pub fn fail(&self, asset: impl Into<AssetId>) -> bool {
        self.finish(&asset.into(), false)
    }

    /// Successfully finish every pending load, oldest asset path first
    pub fn complete_all(&self) -> usize {
        let drained: Vec<(AssetId, VecDeque<LoadCompletion>)> = {
            let mut state = self.state.lock();
            let mut drained: Vec<_> = state.pending.drain().collect();
            drained.sort_by(|a, b| a.0.cmp(&b.0));
            drained
        };

        let mut finished = 0;
        for (_, queue) in drained {
            for completion in queue {
                completion.succeed();
                finished += 1;
            }
        }
        finished
    }

    fn finish(&self, asset: &AssetId, success: bool) -> bool {
        // The lock must be released before re-entering the registry
        match self.take_pending(asset) {
            Some(completion) => {
                completion.complete(success);
                true
            }
            None => false,
        }
    }
}

impl AsyncLoader for MockLoader {
    fn resolve(&self, asset: &AssetId) -> bool {
        !asset.is_empty() && !self.state.lock().invalid.contains(asset)
    }

    fn begin_load(&self, asset: &AssetId, completion: LoadCompletion) {
        let immediate = {
            let mut state = self.state.lock();
            state.begin_loads.push(asset.clone());
            if state.cached.contains(asset) {
                Some(completion)
            } else {
                state
                    .pending
                    .entry(asset.clone())
                    .or_default()
                    .push_back(completion);
                None
            }
        };

        if let Some(completion) = immediate {
            completion.succeed();
        }
    }

    fn unload(&self, asset: &AssetId) {
        self.state.lock().unloads.push(asset.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RequestRegistry;

    #[test]
    fn test_mock_records_calls() {
        let loader = MockLoader::new();
        let registry = RequestRegistry::with_loader(loader.clone());

        let request = registry.request_assets(["a", "b"], None).unwrap();
        assert_eq!(loader.pending_count(), 2);
        assert!(loader.is_pending(&AssetId::new("a")));

        registry.release_assets(request).unwrap();
        assert_eq!(
            loader.unload_calls(),
            vec![AssetId::new("a"), AssetId::new("b")]
        );
    }

    #[test]
    fn test_mock_complete_all() {
        let loader = MockLoader::new();
        let registry = RequestRegistry::with_loader(loader.clone());
        registry.request_assets(["b", "a"], None).unwrap();

        assert_eq!(loader.complete_all(), 2);
        assert_eq!(loader.pending_count(), 0);
        assert!(registry.is_loaded(&AssetId::new("a")));
        assert!(registry.is_loaded(&AssetId::new("b")));
        assert!(!loader.complete("a"));
    }

    #[test]
    fn test_mock_resolution() {
        let loader = MockLoader::new();
        loader.mark_invalid("missing");

        assert!(loader.resolve(&AssetId::new("present")));
        assert!(!loader.resolve(&AssetId::new("missing")));
        assert!(!loader.resolve(&AssetId::new("")));
    }
}
