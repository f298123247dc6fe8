//! The `projectcalico.org/v3` policy API group.

mod policy;
mod staged_global_network_policy;

pub use policy::{
    Action, EntityRule, HttpMatch, HttpPath, IcmpFields, PolicyType, Port, Protocol, Rule,
    RuleMetadata, ServiceAccountMatch, ServiceMatch,
};
pub use staged_global_network_policy::{
    StagedAction, StagedGlobalNetworkPolicy, StagedGlobalNetworkPolicySpec, DEFAULT_TIER,
};
