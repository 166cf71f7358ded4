//! Admission decision engine
//!
//! Resolves the request's kind against the policy registry, types the object
//! only when a policy needs it, and evaluates policies first-deny-wins.

use std::sync::Arc;

use tracing::debug;

use super::error::ObjectDecodeError;
use super::policies::{PolicyRegistry, TypedObject, ValidationContext, Verdict};
use super::review::AdmissionRequest;

/// Stateless decision engine over a frozen policy registry.
///
/// Cheap to clone; every clone shares the same registry.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    registry: Arc<PolicyRegistry>,
}

impl DecisionEngine {
    pub fn new(registry: Arc<PolicyRegistry>) -> Self {
        Self { registry }
    }

    /// Decide a request. An object that fails to decode for a policed kind
    /// is denied.
    pub fn decide(&self, request: &AdmissionRequest) -> Verdict {
        self.evaluate(request)
            .unwrap_or_else(|e| Verdict::unparseable(&e))
    }

    /// Decide a request, surfacing object decode failures to the caller
    pub fn evaluate(&self, request: &AdmissionRequest) -> Result<Verdict, ObjectDecodeError> {
        let policies: Vec<_> = self
            .registry
            .policies_for(&request.kind)
            .iter()
            .filter(|policy| policy.applies_to_operation(&request.operation))
            .collect();

        if policies.is_empty() {
            debug!(
                uid = %request.uid,
                kind = %request.kind,
                operation = ?request.operation,
                "No policies for kind, allowing"
            );
            return Ok(Verdict::allowed());
        }

        let object = TypedObject::decode(&request.kind, request.object.as_ref())?;
        let ctx = ValidationContext {
            kind: &request.kind,
            object: &object,
            operation: &request.operation,
            namespace: request.namespace.as_deref(),
        };

        for policy in policies {
            let verdict = policy.evaluate(&ctx);
            if !verdict.allowed {
                debug!(
                    uid = %request.uid,
                    policy = policy.name(),
                    object = object.name().unwrap_or(""),
                    "Policy denied request"
                );
                return Ok(verdict);
            }
        }

        Ok(Verdict::allowed())
    }
}
