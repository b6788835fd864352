//! PhishGuard Server - campaign API, tracking endpoints and live event stream.
//!
//! This binary:
//! - Accepts campaign definitions and dispatches them through the configured
//!   mail transport
//! - Serves the open beacon and click-through redirect
//! - Streams campaign events to connected observers

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use phishguard::store::CampaignStore;
use phishguard::web::{router, AppState};
use phishguard::{
    broadcast, mail, Broadcaster, Config, FileStore, MailTransport, MemoryStore, TokenCodec,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        public_base_url = %config.public_base_url,
        mail_transport = ?config.mail_transport,
        tracking_keyed = config.tracking_secret.is_some(),
        admin_token_configured = config.admin_token.is_some(),
        data_dir = ?config.data_dir,
        amqp_events = config.cloudamqp_url.is_some(),
        "config_loaded"
    );

    let codec = TokenCodec::from_secret(config.tracking_secret.as_deref())
        .map_err(|e| anyhow::anyhow!("Invalid TRACKING_SECRET: {e}"))?;

    let store: Arc<dyn CampaignStore> = match &config.data_dir {
        Some(dir) => Arc::new(
            FileStore::open(dir)
                .await
                .with_context(|| format!("Failed to open campaign store at {}", dir.display()))?,
        ),
        None => Arc::new(MemoryStore::new()),
    };

    let transport = mail::from_config(&config).context("Failed to set up mail transport")?;
    info!(transport = transport.name(), "mail_transport_ready");

    let events = broadcast::from_config(&config);

    // Create application state
    let state = AppState::new(config.clone(), codec, store, events.clone(), transport);

    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Close broadcaster connection
    events.close().await;

    info!("server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("server_shutting_down");
}
