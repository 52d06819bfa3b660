//! Google OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with Google.

use axum::{
    Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use serde::Deserialize;

use super::session::{SESSION_COOKIE, Session, create_session_token};
use crate::AppState;
use crate::metrics::{LOGINS_TOTAL, LOGOUTS_TOTAL};

const STATE_COOKIE: &str = "oauth_state";
const STATE_COOKIE_PATH: &str = "/auth/google";
const STATE_TTL_MINUTES: i64 = 10;

/// Create authentication router
///
/// Routes:
/// - GET /auth/google - Redirect to Google
/// - GET /auth/google/callback - OAuth callback
/// - GET /auth/logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/google", get(google_redirect))
        .route("/auth/google/callback", get(google_callback))
        .route("/auth/logout", get(logout))
}

/// 302 Found to `location`
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

// =============================================================================
// Google OAuth
// =============================================================================

/// GET /auth/google
///
/// Stores a fresh CSRF state in a short-lived cookie and redirects the
/// browser to Google's consent screen.
async fn google_redirect(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let csrf_state = generate_csrf_state();
    let secure = state.config.should_use_secure_cookies();
    let location = state.provider.authorization_url(&csrf_state);

    tracing::debug!("Redirecting to identity provider");
    (jar.add(state_cookie(csrf_state, secure)), found(&location))
}

/// Query parameters from Google callback
#[derive(Debug, Deserialize)]
struct GoogleCallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
    /// Set by the provider when the user denied consent or the request was bad
    error: Option<String>,
}

/// Why a callback did not produce a session
#[derive(Debug, thiserror::Error)]
enum LoginFailure {
    #[error("provider reported {0}")]
    Denied(String),
    #[error("callback carried no authorization code")]
    MissingCode,
    #[error("state does not match the state cookie")]
    StateMismatch,
    #[error("code exchange failed: {0}")]
    Exchange(crate::error::AppError),
}

impl LoginFailure {
    fn as_label(&self) -> &'static str {
        match self {
            LoginFailure::Denied(_) => "denied",
            LoginFailure::MissingCode => "missing_code",
            LoginFailure::StateMismatch => "state_mismatch",
            LoginFailure::Exchange(_) => "exchange_failed",
        }
    }
}

/// GET /auth/google/callback
///
/// On success sets the session cookie and redirects to `/`. Every failure
/// redirects to `/failure`; the callback never answers with an error status.
async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<GoogleCallbackQuery>,
    jar: CookieJar,
) -> impl IntoResponse {
    let expected_state = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(clear_state_cookie());

    let session = match complete_login(&state, query, expected_state.as_deref()).await {
        Ok(session) => session,
        Err(failure) => {
            tracing::warn!(reason = %failure, "Login failed");
            LOGINS_TOTAL.with_label_values(&[failure.as_label()]).inc();
            return (jar, found("/failure"));
        }
    };

    let token = match create_session_token(&session, &state.session_keys) {
        Ok(token) => token,
        Err(error) => {
            tracing::error!(%error, "Failed to sign session");
            LOGINS_TOTAL.with_label_values(&["signing_failed"]).inc();
            return (jar, found("/failure"));
        }
    };

    tracing::info!(user_id = %session.user_id, "User logged in");
    LOGINS_TOTAL.with_label_values(&["success"]).inc();

    let cookie = session_cookie(
        token,
        state.config.auth.session_max_age,
        state.config.should_use_secure_cookies(),
    );
    (jar.add(cookie), found("/"))
}

async fn complete_login(
    state: &AppState,
    query: GoogleCallbackQuery,
    expected_state: Option<&str>,
) -> Result<Session, LoginFailure> {
    if let Some(error) = query.error {
        return Err(LoginFailure::Denied(error));
    }

    verify_csrf_state(query.state.as_deref(), expected_state)?;

    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or(LoginFailure::MissingCode)?;

    let profile = state
        .provider
        .exchange_code(&code)
        .await
        .map_err(LoginFailure::Exchange)?;

    if profile.id.trim().is_empty() {
        return Err(LoginFailure::Exchange(crate::error::AppError::Provider(
            "profile has no id".to_string(),
        )));
    }

    tracing::debug!(
        user_id = %profile.id,
        email_verified = profile.email_verified,
        "Identity provider returned profile"
    );

    Ok(Session::new(profile.id, state.config.auth.session_max_age))
}

// =============================================================================
// Logout
// =============================================================================

/// GET /auth/logout
///
/// Clears the session cookie and redirects home. Safe to call without a
/// session.
async fn logout(jar: CookieJar) -> impl IntoResponse {
    if jar.get(SESSION_COOKIE).is_some() {
        tracing::info!("User logged out");
    }
    LOGOUTS_TOTAL.inc();

    (jar.remove(clear_session_cookie()), found("/"))
}

// =============================================================================
// Helpers
// =============================================================================

/// Generate a random CSRF state token
fn generate_csrf_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Verify CSRF state from cookie matches callback state
fn verify_csrf_state(received: Option<&str>, expected: Option<&str>) -> Result<(), LoginFailure> {
    match (received, expected) {
        (Some(received), Some(expected)) if !expected.is_empty() && received == expected => Ok(()),
        _ => Err(LoginFailure::StateMismatch),
    }
}

fn state_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(STATE_COOKIE_PATH)
        .max_age(time::Duration::minutes(STATE_TTL_MINUTES))
        .build()
}

fn clear_state_cookie() -> Cookie<'static> {
    Cookie::build((STATE_COOKIE, "")).path(STATE_COOKIE_PATH).build()
}

fn session_cookie(token: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}
