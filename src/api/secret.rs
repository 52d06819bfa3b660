//! The protected resource

use axum::{Router, middleware, routing::get};

use crate::AppState;
use crate::auth::{CurrentUser, require_session};

/// Body of `/secret` for logged-in users
pub const SECRET_MESSAGE: &str = "Your personal secret value is 42!";

/// Routes:
/// - GET /secret - Requires a valid session
pub fn secret_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/secret", get(secret))
        .route_layer(middleware::from_fn_with_state(state, require_session))
}

async fn secret(CurrentUser(session): CurrentUser) -> &'static str {
    tracing::debug!(user_id = %session.user_id, "Serving secret");
    SECRET_MESSAGE
}
