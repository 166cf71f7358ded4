//! Resource kinds recognised by the admission pipeline
//!
//! Kinds that have a typed decoder get their own variant. Everything else is
//! carried as `Other` so it can still be logged and default-allowed.

use std::fmt;

/// The kind of resource an admission request targets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// core/v1 Pod
    Pod,
    /// apps/v1 Deployment
    Deployment,
    /// Any kind this webhook has no typed decoder for
    Other(String),
}

impl ResourceKind {
    /// Kinds with a typed object decoder. Only these can carry policies.
    pub const TYPED: [ResourceKind; 2] = [ResourceKind::Pod, ResourceKind::Deployment];

    /// Resolve the `request.kind` group and kind of an admission request.
    ///
    /// Same-named kinds from other API groups are `Other`, qualified as
    /// `<kind>.<group>`.
    pub fn from_gvk(group: &str, kind: &str) -> Self {
        match (group, kind) {
            ("", "Pod") => ResourceKind::Pod,
            ("apps", "Deployment") => ResourceKind::Deployment,
            ("", other) => ResourceKind::Other(other.to_string()),
            (group, other) => ResourceKind::Other(format!("{other}.{group}")),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Other(kind) => kind,
        }
    }

    /// Whether objects of this kind can be decoded into a typed structure
    pub fn is_typed(&self) -> bool {
        !matches!(self, ResourceKind::Other(_))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
