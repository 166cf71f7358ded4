//! Kind → policy lookup
//!
//! Built once at startup and shared read-only behind an `Arc`; there is no
//! way to register a policy once the registry has been handed to the engine.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Policy, RequireNodeSelector};
use crate::webhooks::error::RegistryError;
use crate::webhooks::kind::ResourceKind;

#[derive(Debug, Default)]
pub struct PolicyRegistry {
    policies: HashMap<ResourceKind, Vec<Arc<dyn Policy>>>,
}

impl PolicyRegistry {
    /// An empty registry. Every kind is default-allowed.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry this webhook serves with: node selectors required on
    /// Pods and Deployments.
    pub fn with_default_policies() -> Self {
        let mut registry = Self::new();
        registry.register_applicable(Arc::new(RequireNodeSelector));
        registry
    }

    /// Register `policy` for `kind`, after any policies already registered
    /// for it.
    pub fn register(
        &mut self,
        kind: ResourceKind,
        policy: Arc<dyn Policy>,
    ) -> Result<(), RegistryError> {
        if !kind.is_typed() {
            return Err(RegistryError::UntypedKind(kind));
        }
        if !policy.applies_to(&kind) {
            return Err(RegistryError::NotApplicable {
                policy: policy.name(),
                kind,
            });
        }

        self.policies.entry(kind).or_default().push(policy);
        Ok(())
    }

    /// Register `policy` for every typed kind it applies to
    pub fn register_applicable(&mut self, policy: Arc<dyn Policy>) {
        for kind in ResourceKind::TYPED {
            if policy.applies_to(&kind) {
                self.policies
                    .entry(kind)
                    .or_default()
                    .push(Arc::clone(&policy));
            }
        }
    }

    /// Policies for `kind` in evaluation order; empty if none are registered
    pub fn policies_for(&self, kind: &ResourceKind) -> &[Arc<dyn Policy>] {
        self.policies.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Kinds with at least one registered policy
    pub fn policed_kinds(&self) -> impl Iterator<Item = &ResourceKind> {
        self.policies
            .iter()
            .filter(|(_, policies)| !policies.is_empty())
            .map(|(kind, _)| kind)
    }

    pub fn is_empty(&self) -> bool {
        self.policies.values().all(Vec::is_empty)
    }
}
