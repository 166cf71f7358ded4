//! Admission response construction
//!
//! Responses are built fresh for every request from either a verdict or an
//! envelope decode failure.

use super::error::DecodeError;
use super::policies::Verdict;
use super::review::{
    ADMISSION_REVIEW_KIND, AdmissionResponse, AdmissionReviewResponse, AdmissionStatus,
    ReviewVersion,
};

/// Status code carried on policy denials
pub const DENIED_CODE: u16 = 403;
/// Status code carried when the review itself was malformed
pub const BAD_REVIEW_CODE: u16 = 400;

/// What the response is being built from
#[derive(Debug)]
pub enum Outcome<'a> {
    Verdict(&'a Verdict),
    DecodeFailed(&'a DecodeError),
}

impl AdmissionResponse {
    /// Copy a verdict. Denials carry the verdict's reason; allows carry no status.
    pub fn from_verdict(uid: Option<&str>, verdict: &Verdict) -> Self {
        let status = if verdict.allowed {
            None
        } else {
            Some(AdmissionStatus {
                code: Some(DENIED_CODE),
                message: None,
                reason: verdict.reason.clone(),
            })
        };

        Self {
            uid: uid.map(str::to_string),
            allowed: verdict.allowed,
            status,
        }
    }

    /// Report an envelope that could not be decoded.
    ///
    /// `uid` is whatever could be salvaged from the body, if anything.
    pub fn from_decode_error(uid: Option<String>, error: &DecodeError) -> Self {
        Self {
            uid,
            allowed: false,
            status: Some(AdmissionStatus {
                code: Some(BAD_REVIEW_CODE),
                message: Some(error.to_string()),
                reason: None,
            }),
        }
    }

    /// Wrap into a review envelope of the given version
    pub fn into_review(self, version: ReviewVersion) -> AdmissionReviewResponse {
        AdmissionReviewResponse {
            api_version: version,
            kind: ADMISSION_REVIEW_KIND.to_string(),
            response: self,
        }
    }
}

/// Build the review sent back for one request
pub fn build(
    version: ReviewVersion,
    uid: Option<&str>,
    outcome: Outcome<'_>,
) -> AdmissionReviewResponse {
    let response = match outcome {
        Outcome::Verdict(verdict) => AdmissionResponse::from_verdict(uid, verdict),
        Outcome::DecodeFailed(error) => {
            AdmissionResponse::from_decode_error(uid.map(str::to_string), error)
        }
    };
    response.into_review(version)
}
