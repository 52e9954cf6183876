//! Marquee checkout server.
//!
//! Main server process:
//! - Loads configuration from the environment
//! - Connects the order archive (`PostgreSQL`) when configured
//! - Selects the payment gateway client (HTTP or mock)
//! - Serves the checkout API and the payment webhook
//!
//! # Usage
//!
//! ```bash
//! # Run with the mock gateway and no archive
//! GATEWAY_USE_MOCK=true cargo run --bin server
//! ```

use marquee::archive::{NullOrderArchive, OrderArchive, PostgresOrderArchive};
use marquee::gateway::{HostedCheckoutClient, MockPaymentGateway, PaymentGateway, WebhookVerifier};
use marquee::server::{AppState, build_router};
use marquee::store::CheckoutStore;
use marquee::{Config, metrics};
use marquee_core::environment::SystemClock;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,marquee=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Marquee checkout server...");

    let config = Config::from_env();
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        archive = config.database.url.is_some(),
        mock_gateway = config.gateway.use_mock,
        "Configuration loaded"
    );

    metrics::register();

    // Order archive: Postgres when configured, otherwise a no-op
    let archive: Arc<dyn OrderArchive> = match &config.database.url {
        Some(url) => {
            let archive = PostgresOrderArchive::connect(
                url,
                config.database.max_connections,
                Duration::from_secs(config.database.connect_timeout),
            )
            .await?;
            tracing::info!("Order archive connected");
            Arc::new(archive)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; running without a durable order archive");
            Arc::new(NullOrderArchive)
        }
    };

    // Payment gateway client
    let gateway: Arc<dyn PaymentGateway> = if config.gateway.use_mock {
        MockPaymentGateway::shared()
    } else {
        Arc::new(HostedCheckoutClient::new(
            config.gateway.api_base.clone(),
            config.gateway.secret_key.clone(),
        ))
    };

    let verifier = Arc::new(WebhookVerifier::new(
        config.gateway.webhook_secret.clone(),
        Duration::from_secs(config.gateway.signature_tolerance),
    ));

    let clock = Arc::new(SystemClock);
    let store = Arc::new(CheckoutStore::new(clock.clone(), archive.clone()));

    let state = AppState::new(
        store,
        gateway,
        verifier,
        archive,
        clock,
        Arc::new(config.clone()),
    );
    let router = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Marquee checkout server is running");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}
