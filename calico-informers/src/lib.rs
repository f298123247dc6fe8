//! Watch-driven caches and listers for Calico staged network policies.
//!
//! An informer keeps a local cache synchronized with the cluster through
//! the kube runtime's list+watch machinery and hands out cheap read
//! views over it. A lister is such a view: indexed, label-filterable
//! lookups that never hit the API server.
//!
//! ```no_run
//! use calico_informers::SharedInformerFactory;
//!
//! # async fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let mut factory = SharedInformerFactory::new(client);
//!
//! let informer = factory.staged_global_network_policies()?;
//! informer.ready().await?;
//!
//! let lister = informer.lister();
//! for policy in lister.list() {
//!     println!("{:?} staged as {:?}", policy.metadata.name, policy.staged_action());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod factory;
pub mod informer;
pub mod lister;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{Error, Result};
pub use factory::SharedInformerFactory;
pub use informer::{
    CreateWatcher, PolicySubscriber, StagedGlobalNetworkPolicyInformer, TweakConfig, WatcherFactory,
};
pub use lister::StagedGlobalNetworkPolicyLister;
