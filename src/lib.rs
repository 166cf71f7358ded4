pub mod health;
pub mod webhooks;

pub use health::{HEALTH_PORT, HealthState, Metrics};
pub use webhooks::{
    DecisionEngine, PolicyRegistry, Verdict, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT,
    WebhookConfig, WebhookError, WebhookState, run_webhook_server,
};

use std::sync::Arc;

/// Build the webhook state served by the binary.
///
/// The policy registry is built here, once, and is read-only from then on.
/// Pass `health` to have requests recorded in its metrics.
pub fn default_webhook_state(health: Option<Arc<HealthState>>) -> WebhookState {
    let registry = Arc::new(PolicyRegistry::with_default_policies());
    tracing::info!(
        kinds = ?registry.policed_kinds().map(|k| k.as_str()).collect::<Vec<_>>(),
        "Policy registry initialized"
    );

    let state = WebhookState::new(DecisionEngine::new(registry));
    match health {
        Some(health) => state.with_health(health),
        None => state,
    }
}
