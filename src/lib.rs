//! SecretGate - a minimal Google OAuth login server
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   HTTP(S) listener (Axum)                    │
//! │  - /auth/google, /auth/google/callback, /auth/logout        │
//! │  - /, /failure, /health                                     │
//! │  - /secret, /metrics (session gate)                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Auth                                 │
//! │  - Identity provider client (Google, reqwest)               │
//! │  - HMAC-signed session cookies                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: Pages, protected secret, metrics endpoint
//! - `auth`: OAuth flow, sessions, session gate
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments
//! - `server`: TLS listener setup

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod server;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Built once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Cookie signing keys, primary first
    pub session_keys: Arc<auth::SessionKeys>,

    /// OAuth identity provider
    pub provider: Arc<dyn auth::IdentityProvider>,
}

impl AppState {
    /// Initialize application state with the Google provider
    ///
    /// # Errors
    /// Returns error if the signing keys are unusable or the HTTP client
    /// cannot be built
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let provider = auth::GoogleProvider::new(&config.auth.google, &config.server)?;
        Self::with_provider(config, Arc::new(provider))
    }

    /// Initialize application state with an arbitrary identity provider
    pub fn with_provider(
        config: config::AppConfig,
        provider: Arc<dyn auth::IdentityProvider>,
    ) -> Result<Self, error::AppError> {
        let session_keys = auth::SessionKeys::new(config.auth.cookie_keys())?;

        if !config.should_use_secure_cookies() {
            tracing::warn!(
                domain = %config.server.domain,
                protocol = %config.server.protocol,
                "Using insecure session cookies for local development"
            );
        }

        tracing::info!(
            callback_url = %config.server.callback_url(),
            "Application state initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            session_keys: Arc::new(session_keys),
            provider,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::trace::TraceLayer;

    Router::new()
        .merge(api::pages_router())
        .merge(auth::auth_router())
        .merge(api::secret_router(state.clone()))
        .merge(api::metrics_router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
