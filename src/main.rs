use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use node_selector_webhook::health::{HEALTH_PORT, HealthState, run_health_server};
use node_selector_webhook::{
    WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookConfig, default_webhook_state,
    run_webhook_server,
};

/// Validating admission webhook that rejects Pods and Deployments without a nodeSelector
#[derive(Parser, Debug)]
#[command(name = "node-selector-webhook", version, about, long_about = None)]
struct Args {
    /// Webhook server port
    #[arg(long, default_value_t = WEBHOOK_PORT)]
    port: u16,

    /// File containing the x509 certificate for HTTPS
    #[arg(long, default_value = WEBHOOK_CERT_PATH)]
    tls_cert_file: PathBuf,

    /// File containing the x509 private key matching --tls-cert-file
    #[arg(long, default_value = WEBHOOK_KEY_PATH)]
    tls_key_file: PathBuf,

    /// Port for the plain HTTP health and metrics server
    #[arg(long, default_value_t = HEALTH_PORT)]
    health_port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Install the TLS crypto provider before any TLS operations
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
        && rustls::crypto::CryptoProvider::get_default().is_none()
    {
        return Err("Failed to install rustls crypto provider and no provider is available".into());
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("node_selector_webhook=info".parse()?),
        )
        .init();

    info!(port = args.port, "Starting node-selector-webhook");

    let health_state = Arc::new(HealthState::new());
    let webhook_state = Arc::new(default_webhook_state(Some(health_state.clone())));

    let health_handle = {
        let health_state = health_state.clone();
        let port = args.health_port;
        tokio::spawn(async move { run_health_server(health_state, port).await })
    };

    let config = WebhookConfig {
        port: args.port,
        cert_path: args.tls_cert_file,
        key_path: args.tls_key_file,
    };
    let webhook_handle = tokio::spawn(run_webhook_server(config, webhook_state));

    // The webhook is the process: if it stops, so do we
    tokio::select! {
        result = webhook_handle => {
            health_state.set_ready(false).await;
            match result {
                Ok(Ok(())) => info!("Webhook server exited"),
                Ok(Err(e)) => {
                    error!("Webhook server error: {}", e);
                    return Err(e.into());
                }
                Err(e) => {
                    error!("Webhook server task panicked: {}", e);
                    return Err(e.into());
                }
            }
        }
        result = health_handle => {
            match result {
                Ok(Ok(())) => info!("Health server exited"),
                Ok(Err(e)) => error!("Health server error: {}", e),
                Err(e) => error!("Health server task panicked: {}", e),
            }
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, shutting down");
            health_state.set_ready(false).await;
        }
    }

    info!("Webhook stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
