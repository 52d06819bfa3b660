//! Authentication middleware
//!
//! Protects routes that require a logged-in session.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};

use super::session::{Session, SessionError, authenticate};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::SESSION_CHECKS_TOTAL;

fn check_session(headers: &HeaderMap, state: &AppState) -> Result<Session, SessionError> {
    let result = authenticate(
        headers,
        &state.session_keys,
        state.config.auth.session_max_age,
    );
    let label = match &result {
        Ok(_) => "valid",
        Err(error) => error.as_label(),
    };
    SESSION_CHECKS_TOTAL.with_label_values(&[label]).inc();
    result
}

/// Middleware to require a valid session
///
/// Verifies the signed `session` cookie and adds the `Session` to
/// request extensions. Rejects with 401 `{"error": "You must log in!"}`.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/secret", get(secret))
///     .route_layer(middleware::from_fn_with_state(state, require_session));
/// ```
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = match check_session(request.headers(), &state) {
        Ok(session) => session,
        Err(reason) => {
            tracing::info!(
                path = %request.uri().path(),
                reason = %reason,
                "Rejected request without a valid session"
            );
            return Err(reason.into());
        }
    };

    tracing::debug!(user_id = %session.user_id, "Session verified");
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// Extractor for current authenticated user
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(session): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", session.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    /// Reuses the session stored by `require_session` when present.
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(CurrentUser(session));
        }

        let state = AppState::from_ref(state);
        let session = check_session(&parts.headers, &state)?;
        parts.extensions.insert(session.clone());

        Ok(CurrentUser(session))
    }
}
