//! Read-only access to cached staged global network policies.

use std::sync::Arc;

use kube::core::{Selector, SelectorExt};
use kube::runtime::reflector::{ObjectRef, Store};
use kube::ResourceExt;

use calico_api::v3::StagedGlobalNetworkPolicy;

/// Read-only, label-filterable view over an informer's local cache.
///
/// Lookups never touch the API server. The view may lag the cluster
/// slightly: deleted objects can linger and fresh objects can be missing
/// until the watch catches up, so treat misses as retryable.
#[derive(Clone)]
pub struct StagedGlobalNetworkPolicyLister {
    store: Store<StagedGlobalNetworkPolicy>,
}

impl StagedGlobalNetworkPolicyLister {
    /// Wrap a reflector store.
    pub fn new(store: Store<StagedGlobalNetworkPolicy>) -> Self {
        Self { store }
    }

    /// Snapshot of every cached policy.
    pub fn list(&self) -> Vec<Arc<StagedGlobalNetworkPolicy>> {
        self.store.state()
    }

    /// Cached policies whose labels match `selector`.
    pub fn list_matching(&self, selector: &Selector) -> Vec<Arc<StagedGlobalNetworkPolicy>> {
        self.store
            .state()
            .into_iter()
            .filter(|policy| selector.matches(policy.labels()))
            .collect()
    }

    /// Look up a single policy by name; `None` when it is not cached.
    pub fn get(&self, name: &str) -> Option<Arc<StagedGlobalNetworkPolicy>> {
        self.store.get(&ObjectRef::new(name))
    }
}
