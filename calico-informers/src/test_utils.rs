//! Helpers shared by the crate's unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use kube::runtime::watcher::{self, Event};
use tokio_util::sync::CancellationToken;

use calico_api::v3::{StagedGlobalNetworkPolicy, StagedGlobalNetworkPolicySpec};

use crate::informer::CreateWatcher;

pub(crate) fn test_policy(name: &str) -> StagedGlobalNetworkPolicy {
    StagedGlobalNetworkPolicy::new(name, StagedGlobalNetworkPolicySpec::default())
}

pub(crate) fn labeled_policy(name: &str, key: &str, value: &str) -> StagedGlobalNetworkPolicy {
    let mut policy = test_policy(name);
    policy
        .metadata
        .labels
        .get_or_insert_with(Default::default)
        .insert(key.to_string(), value.to_string());
    policy
}

/// Serves one scripted watch stream, then pends like a quiet watch
/// connection. A second watch request panics, so informers that fail to
/// share a stream show up loudly.
pub(crate) struct TestWatcherProvider {
    events: Mutex<Option<VecDeque<watcher::Result<Event<StagedGlobalNetworkPolicy>>>>>,
    seen_config: Arc<Mutex<Option<watcher::Config>>>,
    dropped: CancellationToken,
}

impl TestWatcherProvider {
    pub(crate) fn new(events: Vec<watcher::Result<Event<StagedGlobalNetworkPolicy>>>) -> Self {
        Self {
            events: Mutex::new(Some(events.into())),
            seen_config: Arc::new(Mutex::new(None)),
            dropped: CancellationToken::new(),
        }
    }

    /// The configuration the informer started its watch with.
    pub(crate) fn seen_config(&self) -> Option<watcher::Config> {
        self.seen_config.lock().unwrap().clone()
    }

    /// Token cancelled once the served watch stream is dropped.
    pub(crate) fn dropped(&self) -> CancellationToken {
        self.dropped.clone()
    }
}

impl CreateWatcher<StagedGlobalNetworkPolicy> for TestWatcherProvider {
    fn all(
        &self,
        config: watcher::Config,
    ) -> BoxStream<'static, watcher::Result<Event<StagedGlobalNetworkPolicy>>> {
        *self.seen_config.lock().unwrap() = Some(config);
        let events = self
            .events
            .lock()
            .unwrap()
            .take()
            .expect("a test provider serves a single watch");
        let guard = self.dropped.clone().drop_guard();
        stream::unfold((events, guard), |(mut events, guard)| async move {
            match events.pop_front() {
                Some(event) => Some((event, (events, guard))),
                None => futures::future::pending().await,
            }
        })
        .boxed()
    }
}
