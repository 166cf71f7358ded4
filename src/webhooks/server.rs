//! Webhook HTTP server handlers
//!
//! Implements the ValidatingAdmissionWebhook HTTP endpoint. The per-request
//! work in [`WebhookState::handle`] is synchronous; axum and axum-server only
//! supply the TLS listener and the raw body.

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use super::engine::DecisionEngine;
use super::error::WebhookError;
use super::policies::Verdict;
use super::response::{self, Outcome};
use super::review::{self, AdmissionRequest, AdmissionReviewResponse, JSON_CONTENT_TYPE};
use crate::health::{FailureStage, HealthState, Metrics};

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/cert.pem";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/key.pem";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 8443;
/// Path the API server posts admission reviews to
pub const VALIDATE_PATH: &str = "/validate";
/// Upper bound on request bodies; the API server caps objects near 3MiB
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Listener configuration for the webhook server
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub port: u16,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            port: WEBHOOK_PORT,
            cert_path: PathBuf::from(WEBHOOK_CERT_PATH),
            key_path: PathBuf::from(WEBHOOK_KEY_PATH),
        }
    }
}

/// Shared state for webhook handlers
pub struct WebhookState {
    engine: DecisionEngine,
    health: Option<Arc<HealthState>>,
}

impl WebhookState {
    pub fn new(engine: DecisionEngine) -> Self {
        Self {
            engine,
            health: None,
        }
    }

    /// Record metrics into `health` and drive its readiness flag
    pub fn with_health(mut self, health: Arc<HealthState>) -> Self {
        self.health = Some(health);
        self
    }

    fn metrics(&self) -> Option<&Metrics> {
        self.health.as_deref().map(|h| &h.metrics)
    }

    fn record_failure(&self, stage: FailureStage) {
        if let Some(metrics) = self.metrics() {
            metrics.record_failure(stage);
        }
    }

    /// Handle one admission exchange.
    ///
    /// Transport problems (empty body, wrong content type) and response
    /// encode failures map to HTTP errors. Everything else, including an
    /// undecodable review, is answered with 200 and a review body so the API
    /// server can tell a failing webhook from an unreachable one.
    pub fn handle(&self, body: &[u8], content_type: Option<&str>) -> (StatusCode, Vec<u8>) {
        let started = Instant::now();
        let result = self.exchange(body, content_type);

        if let Some(metrics) = self.metrics() {
            metrics.observe_duration(started.elapsed().as_secs_f64());
        }
        result
    }

    fn exchange(&self, body: &[u8], content_type: Option<&str>) -> (StatusCode, Vec<u8>) {
        if body.is_empty() {
            error!("empty body");
            self.record_failure(FailureStage::Transport);
            return (StatusCode::BAD_REQUEST, b"empty body".to_vec());
        }

        if !is_json_content_type(content_type) {
            error!(
                content_type = content_type.unwrap_or(""),
                "invalid Content-Type, expect application/json"
            );
            self.record_failure(FailureStage::Transport);
            return (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                b"invalid Content-Type, expect `application/json`".to_vec(),
            );
        }

        let reply = match review::decode(body) {
            Ok(request) => self.review_request(&request),
            Err(e) => {
                error!(error = %e, "Can't decode admission review");
                self.record_failure(FailureStage::Envelope);
                let (version, uid) = review::salvage_correlation(body);
                response::build(version, uid.as_deref(), Outcome::DecodeFailed(&e))
            }
        };

        match review::encode(&reply) {
            Ok(encoded) => (StatusCode::OK, encoded),
            Err(e) => {
                error!(error = %e, "Can't encode response");
                self.record_failure(FailureStage::Encode);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string().into_bytes())
            }
        }
    }

    fn review_request(&self, request: &AdmissionRequest) -> AdmissionReviewResponse {
        let uid = &request.uid;
        info!(
            uid = %uid,
            kind = %request.kind,
            group = %request.gvk.group,
            version = %request.gvk.version,
            namespace = ?request.namespace,
            name = ?request.name,
            operation = request.operation_name(),
            user = request.username(),
            dry_run = request.dry_run,
            "Processing admission request"
        );

        let verdict = match self.engine.evaluate(request) {
            Ok(verdict) => verdict,
            Err(e) => {
                error!(uid = %uid, kind = %request.kind, error = %e, "Could not parse object");
                self.record_failure(FailureStage::Object);
                Verdict::unparseable(&e)
            }
        };

        if verdict.allowed {
            info!(uid = %uid, "Admission request allowed");
        } else {
            warn!(
                uid = %uid,
                kind = %request.kind,
                name = ?request.name,
                reason = verdict.reason.as_deref().unwrap_or(""),
                "Admission request denied"
            );
        }

        if let Some(metrics) = self.metrics() {
            metrics.record_admission(
                request.kind.as_str(),
                request.operation_name(),
                verdict.allowed,
            );
        }

        response::build(request.version, Some(uid), Outcome::Verdict(&verdict))
    }
}

/// The header must be exactly `application/json`, with no parameters
fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type == Some(JSON_CONTENT_TYPE)
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(VALIDATE_PATH, post(validate))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Validate admission webhook handler
async fn validate(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    let (status, body) = state.handle(&body, content_type);
    let media_type = if status == StatusCode::OK {
        JSON_CONTENT_TYPE
    } else {
        TEXT_CONTENT_TYPE
    };

    (status, [(header::CONTENT_TYPE, media_type)], body).into_response()
}

/// Run the webhook server with TLS
///
/// Binds to `0.0.0.0:<port>` and serves the /validate endpoint. The server
/// is marked ready once the certificate and key have been loaded.
pub async fn run_webhook_server(
    config: WebhookConfig,
    state: Arc<WebhookState>,
) -> Result<(), WebhookError> {
    use axum_server::tls_rustls::RustlsConfig;

    let tls = RustlsConfig::from_pem_file(&config.cert_path, &config.key_path)
        .await
        .map_err(|e| WebhookError::TlsConfig(e.to_string()))?;

    let health = state.health.clone();
    let app = create_webhook_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Webhook server listening on {} with TLS", addr);
    if let Some(health) = &health {
        health.set_ready(true).await;
    }

    let result = axum_server::bind_rustls(addr, tls)
        .serve(app.into_make_service())
        .await
        .map_err(|e| WebhookError::Server(e.to_string()));

    if let Some(health) = &health {
        health.set_ready(false).await;
    }
    result
}
