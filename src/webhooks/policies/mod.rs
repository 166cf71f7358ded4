//! Admission webhook policies
//!
//! A policy is a pure predicate over a typed resource object. Policies are
//! registered per kind in a [`PolicyRegistry`] and evaluated in registration
//! order; the first denial wins.

pub mod node_selector;
mod registry;

pub use node_selector::{NODE_SELECTOR_REQUIRED, RequireNodeSelector};
pub use registry::PolicyRegistry;

use std::fmt;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, PodSpec};
use kube::core::admission::Operation;
use serde::Deserialize;
use serde_json::Value;

use super::error::ObjectDecodeError;
use super::kind::ResourceKind;

/// Outcome of evaluating policies against one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub allowed: bool,
    /// Why the request was denied. Always `None` when allowed.
    pub reason: Option<String>,
}

impl Verdict {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Deny an object that could not be decoded for a policed kind.
    ///
    /// An object that cannot be parsed cannot be shown to comply.
    pub fn unparseable(error: &ObjectDecodeError) -> Self {
        Self::denied(format!("could not parse object: {}", error))
    }
}

/// A resource object decoded into the structure its kind expects
#[derive(Debug, Clone, PartialEq)]
pub enum TypedObject {
    Pod(Box<Pod>),
    Deployment(Box<Deployment>),
}

impl TypedObject {
    /// Second decode phase: type the raw object for a kind with a decoder
    pub fn decode(kind: &ResourceKind, object: Option<&Value>) -> Result<Self, ObjectDecodeError> {
        let object = object.ok_or(ObjectDecodeError::Missing)?;

        match kind {
            ResourceKind::Pod => Ok(TypedObject::Pod(Box::new(Pod::deserialize(object)?))),
            ResourceKind::Deployment => Ok(TypedObject::Deployment(Box::new(
                Deployment::deserialize(object)?,
            ))),
            ResourceKind::Other(_) => Err(ObjectDecodeError::UnsupportedKind(kind.clone())),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            TypedObject::Pod(_) => ResourceKind::Pod,
            TypedObject::Deployment(_) => ResourceKind::Deployment,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            TypedObject::Pod(pod) => pod.metadata.name.as_deref(),
            TypedObject::Deployment(deployment) => deployment.metadata.name.as_deref(),
        }
    }

    /// The pod spec that will be scheduled: the Pod's own spec, or the
    /// Deployment's pod template spec.
    pub fn pod_spec(&self) -> Option<&PodSpec> {
        match self {
            TypedObject::Pod(pod) => pod.spec.as_ref(),
            TypedObject::Deployment(deployment) => deployment
                .spec
                .as_ref()
                .and_then(|spec| spec.template.spec.as_ref()),
        }
    }
}

/// Context handed to every policy evaluation
pub struct ValidationContext<'a> {
    pub kind: &'a ResourceKind,
    pub object: &'a TypedObject,
    pub operation: &'a Operation,
    pub namespace: Option<&'a str>,
}

/// A compliance rule over one or more resource kinds.
///
/// Implementations must be side-effect free: evaluation stops at the first
/// denial, and the same request may be evaluated more than once.
pub trait Policy: Send + Sync + fmt::Debug {
    /// Stable identifier used in logs
    fn name(&self) -> &'static str;

    /// Whether this policy can evaluate objects of `kind`
    fn applies_to(&self, kind: &ResourceKind) -> bool;

    /// Whether this policy polices `operation`.
    ///
    /// DELETE and CONNECT carry no new object, so by default only CREATE and
    /// UPDATE are policed.
    fn applies_to_operation(&self, operation: &Operation) -> bool {
        matches!(operation, Operation::Create | Operation::Update)
    }

    fn evaluate(&self, ctx: &ValidationContext<'_>) -> Verdict;
}
