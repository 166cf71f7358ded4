//! Node selector policy
//!
//! Every Pod, and every Deployment's pod template, must pin itself to a set
//! of nodes with a non-empty `nodeSelector`.

use super::{Policy, ValidationContext, Verdict};
use crate::webhooks::kind::ResourceKind;

/// Denial reason returned when no node selector is declared
pub const NODE_SELECTOR_REQUIRED: &str = "required nodeSelector are not set";

/// Rule: `spec.nodeSelector` (Pod) or `spec.template.spec.nodeSelector`
/// (Deployment) must contain at least one entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequireNodeSelector;

impl Policy for RequireNodeSelector {
    fn name(&self) -> &'static str {
        "require-node-selector"
    }

    fn applies_to(&self, kind: &ResourceKind) -> bool {
        matches!(kind, ResourceKind::Pod | ResourceKind::Deployment)
    }

    fn evaluate(&self, ctx: &ValidationContext<'_>) -> Verdict {
        let has_selector = ctx
            .object
            .pod_spec()
            .and_then(|spec| spec.node_selector.as_ref())
            .is_some_and(|selector| !selector.is_empty());

        if has_selector {
            Verdict::allowed()
        } else {
            Verdict::denied(NODE_SELECTOR_REQUIRED)
        }
    }
}
