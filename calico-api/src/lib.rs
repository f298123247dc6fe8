//! Typed `projectcalico.org/v3` staged network policy resources.
//!
//! The types here are wire-compatible with the Calico API server, so they
//! can be used directly with a kube `Api` or fed into the reflector
//! machinery in `calico-informers`.

use kube::CustomResourceExt;
use thiserror::Error;

pub mod v3;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Render the CRD manifest for [`v3::StagedGlobalNetworkPolicy`] as a YAML
/// document, ready to pipe to `kubectl apply`.
pub fn staged_global_network_policy_crd() -> Result<String> {
    Ok(format!(
        "---\n{}",
        serde_yaml::to_string(&v3::StagedGlobalNetworkPolicy::crd())?
    ))
}
