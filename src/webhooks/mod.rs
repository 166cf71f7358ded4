//! Validating admission webhook
//!
//! The pipeline for one admission exchange:
//! - [`review`] decodes the AdmissionReview envelope (phase one)
//! - [`engine`] looks the kind up in the [`PolicyRegistry`], types the
//!   embedded object (phase two) and evaluates policies first-deny-wins
//! - [`response`] wraps the verdict back into an AdmissionReview
//! - [`server`] orchestrates the above per HTTP request and owns the TLS listener

pub mod engine;
pub mod error;
pub mod kind;
pub mod policies;
pub mod response;
pub mod review;
mod server;

pub use engine::DecisionEngine;
pub use error::{DecodeError, EncodeError, ObjectDecodeError, RegistryError, WebhookError};
pub use kind::ResourceKind;
pub use policies::{Policy, PolicyRegistry, TypedObject, ValidationContext, Verdict};
pub use review::{AdmissionRequest, AdmissionResponse, AdmissionReviewResponse, ReviewVersion};
pub use server::{
    MAX_BODY_BYTES, VALIDATE_PATH, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT,
    WebhookConfig, WebhookState, create_webhook_router, run_webhook_server,
};

// Re-export kube-rs admission operation for contract testing
pub use kube::core::admission::Operation;
