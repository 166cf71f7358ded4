//! AdmissionReview wire codec
//!
//! Decoding is the first of two phases: only the envelope is decoded here.
//! The embedded resource object stays an untyped JSON value until a policy
//! for its kind needs it (see [`crate::webhooks::policies::TypedObject`]).

use k8s_openapi::api::authentication::v1::UserInfo;
use kube::core::admission::Operation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{DecodeError, EncodeError};
use super::kind::ResourceKind;

/// Envelope `kind` of every admission review
pub const ADMISSION_REVIEW_KIND: &str = "AdmissionReview";

/// The only media type accepted on the webhook endpoint
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Supported admission review API versions.
///
/// The response must use the same version as the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewVersion {
    #[default]
    #[serde(rename = "admission.k8s.io/v1")]
    V1,
    #[serde(rename = "admission.k8s.io/v1beta1")]
    V1Beta1,
}

impl ReviewVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewVersion::V1 => "admission.k8s.io/v1",
            ReviewVersion::V1Beta1 => "admission.k8s.io/v1beta1",
        }
    }
}

/// Fully-qualified kind of the object under review
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    pub kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewEnvelope {
    api_version: ReviewVersion,
    kind: String,
    request: Option<WireRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    uid: String,
    kind: GroupVersionKind,
    namespace: Option<String>,
    name: Option<String>,
    operation: Operation,
    #[serde(default)]
    user_info: UserInfo,
    object: Option<Value>,
    dry_run: Option<bool>,
}

/// A decoded admission request.
///
/// Owned by a single handler invocation and never mutated after decoding.
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    /// API version of the review, echoed on the response
    pub version: ReviewVersion,
    /// Correlation id, echoed on the response
    pub uid: String,
    pub kind: ResourceKind,
    /// Group, version and kind as sent, logged with the request
    pub gvk: GroupVersionKind,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub operation: Operation,
    /// Requester identity, logged but opaque to policies
    pub user_info: UserInfo,
    /// The untyped resource body
    pub object: Option<Value>,
    pub dry_run: bool,
}

impl AdmissionRequest {
    /// Username of the requester, if the API server supplied one
    pub fn username(&self) -> &str {
        self.user_info.username.as_deref().unwrap_or("")
    }

    /// Wire name of the operation (`CREATE`, `UPDATE`, ...)
    #[allow(unreachable_patterns)]
    pub fn operation_name(&self) -> &'static str {
        match self.operation {
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Connect => "CONNECT",
            _ => "UNKNOWN",
        }
    }
}

/// Decode an admission review envelope
pub fn decode(body: &[u8]) -> Result<AdmissionRequest, DecodeError> {
    let envelope: ReviewEnvelope = serde_json::from_slice(body)?;

    if envelope.kind != ADMISSION_REVIEW_KIND {
        return Err(DecodeError::UnexpectedKind(envelope.kind));
    }

    let request = envelope.request.ok_or(DecodeError::MissingRequest)?;
    if request.uid.is_empty() {
        return Err(DecodeError::MissingUid);
    }

    Ok(AdmissionRequest {
        version: envelope.api_version,
        uid: request.uid,
        kind: ResourceKind::from_gvk(&request.kind.group, &request.kind.kind),
        gvk: request.kind,
        namespace: request.namespace,
        name: request.name,
        operation: request.operation,
        user_info: request.user_info,
        object: request.object,
        dry_run: request.dry_run.unwrap_or(false),
    })
}

/// Best-effort recovery of the review version and correlation id from a body
/// that failed to decode.
///
/// Falls back to `admission.k8s.io/v1` and no uid when the body is not JSON
/// or the fields are missing or of the wrong type.
pub fn salvage_correlation(body: &[u8]) -> (ReviewVersion, Option<String>) {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return (ReviewVersion::default(), None);
    };

    let version = value
        .get("apiVersion")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();
    let uid = value
        .get("request")
        .and_then(|r| r.get("uid"))
        .and_then(Value::as_str)
        .filter(|uid| !uid.is_empty())
        .map(str::to_string);

    (version, uid)
}

/// Admission review sent back to the API server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReviewResponse {
    pub api_version: ReviewVersion,
    pub kind: String,
    pub response: AdmissionResponse,
}

/// AdmissionResponse contains the result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    /// Absent only when the request could not be decoded far enough to find it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AdmissionStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Encode an admission review response.
///
/// Field order follows struct declaration order, so output is deterministic.
pub fn encode(review: &AdmissionReviewResponse) -> Result<Vec<u8>, EncodeError> {
    Ok(serde_json::to_vec(review)?)
}
