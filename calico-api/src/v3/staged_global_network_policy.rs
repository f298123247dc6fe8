use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::policy::{PolicyType, Rule};

/// Name of the tier a policy without an explicit tier belongs to.
pub const DEFAULT_TIER: &str = "default";

/// What applying the staged policy would do to the enforced set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum StagedAction {
    /// The policy would be created or updated.
    Set,
    /// The enforced policy of the same name would be deleted.
    Delete,
}

/// A cluster-wide network policy staged for review before enforcement.
///
/// Carries the same match semantics as an enforced global network policy,
/// plus a [`StagedAction`] describing the change being previewed. The
/// dataplane never acts on staged policies; they exist so a change can be
/// audited against live traffic first.
#[derive(CustomResource, Serialize, Deserialize, Default, PartialEq, Clone, Debug, JsonSchema)]
#[kube(
    group = "projectcalico.org",
    version = "v3",
    kind = "StagedGlobalNetworkPolicy",
    plural = "stagedglobalnetworkpolicies",
    derive = "Default",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct StagedGlobalNetworkPolicySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staged_action: Option<StagedAction>,
    /// Tier this policy belongs to; empty means the default tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    /// Relative evaluation order within the tier; unset sorts last.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub do_not_track: bool,
    #[serde(rename = "preDNAT", default, skip_serializing_if = "is_false")]
    pub pre_dnat: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub apply_on_forward: bool,
    /// Endpoint selector; empty selects all endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_selector: Option<String>,
    /// Which traffic directions the policy governs; defaulted from the
    /// rule lists when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<PolicyType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<Rule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub egress: Vec<Rule>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl StagedGlobalNetworkPolicy {
    /// The staged action, treating an unset field as `Set`.
    pub fn staged_action(&self) -> StagedAction {
        self.spec.staged_action.unwrap_or(StagedAction::Set)
    }

    /// True when applying this policy would delete the enforced one.
    pub fn is_staged_delete(&self) -> bool {
        self.staged_action() == StagedAction::Delete
    }

    /// The tier the policy belongs to, applying the default.
    pub fn tier(&self) -> &str {
        self.spec.tier.as_deref().unwrap_or(DEFAULT_TIER)
    }

    /// The traffic directions the policy governs once defaulting is applied.
    ///
    /// Explicit `types` win. Otherwise pre-DNAT policies are ingress-only,
    /// and the directions follow whichever rule lists are present, with
    /// ingress as the fallback for a policy carrying no rules at all.
    pub fn enforced_types(&self) -> Vec<PolicyType> {
        if !self.spec.types.is_empty() {
            return self.spec.types.clone();
        }
        if self.spec.pre_dnat {
            return vec![PolicyType::Ingress];
        }
        match (self.spec.ingress.is_empty(), self.spec.egress.is_empty()) {
            (false, false) => vec![PolicyType::Ingress, PolicyType::Egress],
            (true, false) => vec![PolicyType::Egress],
            _ => vec![PolicyType::Ingress],
        }
    }
}
