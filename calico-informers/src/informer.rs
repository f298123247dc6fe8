//! Watch-driven cache for staged global network policies.
//!
//! The watch loop, relist-on-desync, retry backoff and store maintenance
//! are all owned by the kube runtime; an informer only binds that
//! machinery to the resource type and hands out read views over the
//! resulting cache.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use kube::runtime::reflector::{self, ReflectHandle, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use calico_api::v3::StagedGlobalNetworkPolicy;

use crate::error::{Error, Result};
use crate::lister::StagedGlobalNetworkPolicyLister;

/// Mutates the watch configuration before the watch stream is built.
pub type TweakConfig = Arc<dyn Fn(&mut watcher::Config) + Send + Sync>;

/// Events applied to the informer's cache, for subscribers.
pub type PolicySubscriber = ReflectHandle<StagedGlobalNetworkPolicy>;

// Dispatch buffer of the shared store; a subscriber lagging further than
// this behind the watch stalls the reflector until it catches up.
const EVENT_BUFFER: usize = 1024;

/// Produces the watch event stream an informer caches from.
///
/// The production implementation is [`WatcherFactory`]. Tests substitute
/// providers that serve scripted event streams.
pub trait CreateWatcher<K> {
    /// Start a cluster-wide watch with the given configuration.
    fn all(&self, config: watcher::Config)
        -> BoxStream<'static, watcher::Result<watcher::Event<K>>>;
}

/// [`CreateWatcher`] backed by a [`Client`].
pub struct WatcherFactory<K> {
    client: Client,
    _resource: PhantomData<K>,
}

impl<K> WatcherFactory<K> {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _resource: PhantomData,
        }
    }
}

impl<K> CreateWatcher<K> for WatcherFactory<K>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Default,
{
    fn all(
        &self,
        config: watcher::Config,
    ) -> BoxStream<'static, watcher::Result<watcher::Event<K>>> {
        watcher(Api::all(self.client.clone()), config).boxed()
    }
}

/// Handle to a shared, watch-synchronized cache of
/// [`StagedGlobalNetworkPolicy`] objects.
///
/// Cloning is cheap and clones observe the same cache. Dropping handles
/// does not stop the underlying watch; call [`shutdown`](Self::shutdown)
/// (or shut the owning factory down) to stop it.
#[derive(Clone)]
pub struct StagedGlobalNetworkPolicyInformer {
    reader: Store<StagedGlobalNetworkPolicy>,
    cancel: CancellationToken,
}

impl StagedGlobalNetworkPolicyInformer {
    /// Create an informer over every staged global network policy.
    ///
    /// Prefer obtaining informers from a
    /// [`SharedInformerFactory`](crate::factory::SharedInformerFactory) so
    /// consumers share one cache and one watch connection per resource
    /// type.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime; the watch is driven by
    /// a spawned task.
    pub fn new(client: Client) -> Result<Self> {
        Self::new_filtered(client, None)
    }

    /// Create an informer whose watch options are adjusted by `tweak`
    /// before the watch starts.
    pub fn new_filtered(client: Client, tweak: Option<TweakConfig>) -> Result<Self> {
        let (informer, _) =
            Self::new_with(&WatcherFactory::new(client), tweak, CancellationToken::new())?;
        Ok(informer)
    }

    /// Create an informer along with a subscription to the objects its
    /// cache applies.
    ///
    /// The subscriber yields each object as its watch event lands in the
    /// cache (deletions refresh the cache but are not re-delivered), and
    /// ends when the informer shuts down. Additional subscribers are
    /// obtained by cloning the returned handle; every subscriber must be
    /// driven, or the shared stream stops making progress.
    pub fn new_with_subscriber(
        client: Client,
        tweak: Option<TweakConfig>,
    ) -> Result<(Self, PolicySubscriber)> {
        Self::new_with(&WatcherFactory::new(client), tweak, CancellationToken::new())
    }

    /// Wire an informer over an arbitrary watch source.
    ///
    /// Cancelling `cancel` stops the drive task and ends subscriber
    /// streams. The returned subscriber may simply be dropped when only
    /// the cache is of interest.
    pub fn new_with<W>(
        provider: &W,
        tweak: Option<TweakConfig>,
        cancel: CancellationToken,
    ) -> Result<(Self, PolicySubscriber)>
    where
        W: CreateWatcher<StagedGlobalNetworkPolicy>,
    {
        let mut config = watcher::Config::default();
        if let Some(tweak) = &tweak {
            tweak(&mut config);
        }

        let (reader, writer) = reflector::store_shared(EVENT_BUFFER);
        let subscriber = writer
            .subscribe()
            .ok_or_else(|| Error::StoreCreation("failed to create subscriber".into()))?;

        let events = provider
            .all(config)
            .default_backoff()
            .reflect_shared(writer)
            .for_each(|event| async move {
                match event {
                    Ok(event) => trace!("received event: {:?}", event),
                    Err(err) => error!(%err, "unexpected error from watch stream"),
                }
            });

        let stop = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = stop.cancelled() => debug!("informer stopped"),
                () = events => debug!("watch stream ended"),
            }
        });

        Ok((Self { reader, cancel }, subscriber))
    }

    /// The raw reflector store backing this informer.
    pub fn store(&self) -> Store<StagedGlobalNetworkPolicy> {
        self.reader.clone()
    }

    /// A read-only lister view over the informer's cache.
    pub fn lister(&self) -> StagedGlobalNetworkPolicyLister {
        StagedGlobalNetworkPolicyLister::new(self.reader.clone())
    }

    /// Wait until the cache holds a complete snapshot of the watched set.
    pub async fn ready(&self) -> Result<()> {
        self.reader
            .wait_until_ready()
            .await
            .map_err(|err| Error::StoreCreation(err.to_string()))
    }

    /// Like [`ready`](Self::ready), but gives up after `timeout`.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.ready())
            .await
            .map_err(|_| Error::SyncTimeout)?
    }

    /// Stop the watch and end all subscriber streams.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use futures::StreamExt;
    use kube::runtime::watcher::Event;
    use kube::ResourceExt;
    use tokio_util::sync::CancellationToken;

    use crate::test_utils::{test_policy, TestWatcherProvider};

    use super::{StagedGlobalNetworkPolicyInformer, TweakConfig};

    #[tokio::test]
    async fn store_syncs_after_initial_list() {
        let provider = TestWatcherProvider::new(vec![
            Ok(Event::Init),
            Ok(Event::InitApply(test_policy("default.allow-dns"))),
            Ok(Event::InitDone),
        ]);
        let (informer, _subscriber) =
            StagedGlobalNetworkPolicyInformer::new_with(&provider, None, CancellationToken::new())
                .unwrap();

        informer.wait_ready(Duration::from_secs(1)).await.unwrap();

        assert_eq!(informer.store().state().len(), 1);
        let cached = informer.lister().get("default.allow-dns");
        assert_eq!(cached.unwrap().name_any(), "default.allow-dns");
    }

    #[tokio::test]
    async fn tweak_is_applied_before_the_watch_starts() {
        let provider = TestWatcherProvider::new(vec![Ok(Event::Init), Ok(Event::InitDone)]);
        let tweak: TweakConfig = Arc::new(|config| {
            config.label_selector = Some("projectcalico.org/tier=net-sec".to_string());
        });

        let _handles = StagedGlobalNetworkPolicyInformer::new_with(
            &provider,
            Some(tweak),
            CancellationToken::new(),
        )
        .unwrap();

        let seen = provider.seen_config().expect("watch was started");
        assert_eq!(
            seen.label_selector.as_deref(),
            Some("projectcalico.org/tier=net-sec")
        );
    }

    #[tokio::test]
    async fn subscriber_receives_applied_objects() {
        let provider = TestWatcherProvider::new(vec![
            Ok(Event::Init),
            Ok(Event::InitDone),
            Ok(Event::Apply(test_policy("default.deny-egress"))),
        ]);
        let (informer, mut subscriber) =
            StagedGlobalNetworkPolicyInformer::new_with(&provider, None, CancellationToken::new())
                .unwrap();

        informer.wait_ready(Duration::from_secs(1)).await.unwrap();

        let applied = subscriber.next().await.expect("an applied object");
        assert_eq!(applied.name_any(), "default.deny-egress");
    }

    #[tokio::test]
    async fn shutdown_ends_subscriber_streams() {
        let provider = TestWatcherProvider::new(vec![Ok(Event::Init), Ok(Event::InitDone)]);
        let (informer, mut subscriber) =
            StagedGlobalNetworkPolicyInformer::new_with(&provider, None, CancellationToken::new())
                .unwrap();
        informer.wait_ready(Duration::from_secs(1)).await.unwrap();

        informer.shutdown();

        let end = tokio::time::timeout(Duration::from_secs(1), subscriber.next())
            .await
            .expect("subscriber stream should end after shutdown");
        assert!(end.is_none());
    }
}
