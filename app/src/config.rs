//! Configuration management for the checkout service.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Order archive (`PostgreSQL`) configuration
    pub database: DatabaseConfig,
    /// Payment gateway configuration
    pub gateway: GatewayConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Order archive configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL. When absent the service runs without
    /// a durable archive (development and tests).
    pub url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
}

/// Payment gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the gateway REST API
    pub api_base: String,
    /// Secret API key for session creation
    pub secret_key: String,
    /// Shared secret for webhook signature verification
    pub webhook_secret: String,
    /// Signature timestamp tolerance in seconds (replay protection)
    pub signature_tolerance: u64,
    /// Redirect target after successful payment (also the free-checkout
    /// redirect)
    pub success_url: String,
    /// Redirect target when the customer abandons the hosted page
    pub cancel_url: String,
    /// Use the in-process mock gateway instead of the HTTP client
    pub use_mock: bool,
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8080),
                log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok(),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                connect_timeout: env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            },
            gateway: GatewayConfig {
                api_base: env::var("GATEWAY_API_BASE")
                    .unwrap_or_else(|_| "https://api.gateway.example".to_string()),
                secret_key: env::var("GATEWAY_SECRET_KEY")
                    .unwrap_or_else(|_| "sk_test_dev".to_string()),
                webhook_secret: env::var("GATEWAY_WEBHOOK_SECRET")
                    .unwrap_or_else(|_| "whsec_dev_change_in_production".to_string()),
                signature_tolerance: env::var("GATEWAY_SIGNATURE_TOLERANCE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300), // 5 minutes
                success_url: env::var("CHECKOUT_SUCCESS_URL")
                    .unwrap_or_else(|_| "http://localhost:8080/checkout/success".to_string()),
                cancel_url: env::var("CHECKOUT_CANCEL_URL")
                    .unwrap_or_else(|_| "http://localhost:8080/checkout/cancel".to_string()),
                use_mock: env::var("GATEWAY_USE_MOCK")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(false),
            },
        }
    }
}
