//! Error types for the admission pipeline

use thiserror::Error;

use super::kind::ResourceKind;

/// The admission review envelope could not be decoded.
///
/// These never reach the decision engine. The handler still answers with a
/// well-formed review carrying the error text.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("could not decode admission review: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unexpected envelope kind {0:?}, expected AdmissionReview")]
    UnexpectedKind(String),

    #[error("admission review has no request")]
    MissingRequest,

    #[error("admission request has an empty uid")]
    MissingUid,
}

/// The embedded resource object could not be decoded into its typed form
#[derive(Error, Debug)]
pub enum ObjectDecodeError {
    #[error("missing object in request")]
    Missing,

    #[error("no typed decoder for kind {0}")]
    UnsupportedKind(ResourceKind),

    #[error("{0}")]
    Invalid(#[from] serde_json::Error),
}

/// The admission response could not be serialized
#[derive(Error, Debug)]
#[error("could not encode response: {0}")]
pub struct EncodeError(#[from] pub serde_json::Error);

/// Policy registration was rejected
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("policy {policy} does not apply to kind {kind}")]
    NotApplicable {
        policy: &'static str,
        kind: ResourceKind,
    },

    #[error("kind {0} has no typed decoder and cannot carry policies")]
    UntypedKind(ResourceKind),
}

/// Errors that can occur when running the webhook server
#[derive(Error, Debug)]
pub enum WebhookError {
    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),
    /// Server error
    #[error("Webhook server error: {0}")]
    Server(String),
}
