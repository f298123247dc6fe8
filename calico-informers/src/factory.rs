//! Shared construction of informers.
//!
//! One informer per resource type, created on first request and handed
//! out as a shared handle afterwards, so every consumer reads one cache
//! over one watch connection.

use kube::Client;
use tokio_util::sync::CancellationToken;

use calico_api::v3::StagedGlobalNetworkPolicy;

use crate::error::Result;
use crate::informer::{
    CreateWatcher, StagedGlobalNetworkPolicyInformer, TweakConfig, WatcherFactory,
};

/// Builds and memoizes informers over a single watch source.
///
/// A factory-wide [`TweakConfig`] applies to every informer it builds.
pub struct SharedInformerFactory<W = WatcherFactory<StagedGlobalNetworkPolicy>> {
    provider: W,
    tweak: Option<TweakConfig>,
    cancel: CancellationToken,
    staged_global_network_policies: Option<StagedGlobalNetworkPolicyInformer>,
}

impl SharedInformerFactory {
    /// Factory over a client with default watch options.
    pub fn new(client: Client) -> Self {
        Self::with_provider(WatcherFactory::new(client), None)
    }

    /// Factory whose informers all apply `tweak` to their watch options.
    pub fn with_tweak(client: Client, tweak: TweakConfig) -> Self {
        Self::with_provider(WatcherFactory::new(client), Some(tweak))
    }
}

impl<W> SharedInformerFactory<W>
where
    W: CreateWatcher<StagedGlobalNetworkPolicy>,
{
    /// Factory over an arbitrary watch source.
    pub fn with_provider(provider: W, tweak: Option<TweakConfig>) -> Self {
        Self {
            provider,
            tweak,
            cancel: CancellationToken::new(),
            staged_global_network_policies: None,
        }
    }

    /// The shared informer for staged global network policies.
    ///
    /// Constructed on first use; later calls return a handle over the same
    /// cache and watch connection. Factory informers serve cache reads;
    /// consumers that also want a subscription should build their informer
    /// through
    /// [`new_with_subscriber`](StagedGlobalNetworkPolicyInformer::new_with_subscriber).
    pub fn staged_global_network_policies(&mut self) -> Result<StagedGlobalNetworkPolicyInformer> {
        if let Some(informer) = &self.staged_global_network_policies {
            return Ok(informer.clone());
        }
        let (informer, _) = StagedGlobalNetworkPolicyInformer::new_with(
            &self.provider,
            self.tweak.clone(),
            self.cancel.child_token(),
        )?;
        self.staged_global_network_policies = Some(informer.clone());
        Ok(informer)
    }

    /// Stop every informer this factory started.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
