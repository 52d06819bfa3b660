//! Public pages
//!
//! Served regardless of authentication state.

use axum::{
    Router,
    response::{Html, IntoResponse},
    routing::get,
};

/// Body of `/failure`
pub const FAILURE_MESSAGE: &str = "Failed to login.";

const LANDING_PAGE: &str = include_str!("../../public/index.html");

/// Routes:
/// - GET / - Landing page
/// - GET /failure - Login failure notice
/// - GET /health - Liveness probe
pub fn pages_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(landing_page))
        .route("/failure", get(failure))
        .route("/health", get(health_check))
}

async fn landing_page() -> impl IntoResponse {
    Html(LANDING_PAGE)
}

async fn failure() -> &'static str {
    FAILURE_MESSAGE
}

async fn health_check() -> &'static str {
    "OK"
}
