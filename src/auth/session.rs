//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.

use axum::http::HeaderMap;
use axum_extra::extract::CookieJar;
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Name of the cookie carrying the signed session
pub const SESSION_COOKIE: &str = "session";

/// User session data
///
/// Stored in a signed cookie. Only the provider's user id is kept;
/// there is no server-side profile store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// External user id reported by the identity provider
    pub user_id: String,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `user_id` lasting `max_age_secs`
    pub fn new(user_id: impl Into<String>, max_age_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            created_at: now,
            expires_at: now + Duration::seconds(max_age_secs),
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Check if the session was issued more than `max_age_secs` ago
    ///
    /// Applies the currently configured lifetime to sessions issued under
    /// a longer one.
    pub fn is_older_than(&self, max_age_secs: i64) -> bool {
        match Duration::try_seconds(max_age_secs)
            .and_then(|max_age| self.created_at.checked_add_signed(max_age))
        {
            Some(deadline) => deadline <= Utc::now(),
            None => false,
        }
    }
}

/// Why a request carries no usable session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no session cookie")]
    Missing,
    #[error("malformed session token")]
    Malformed,
    #[error("session signature does not match any key")]
    InvalidSignature,
    #[error("session expired")]
    Expired,
    #[error("session has no user id")]
    EmptyIdentity,
}

impl SessionError {
    /// Label used for the session check metric
    pub fn as_label(&self) -> &'static str {
        match self {
            SessionError::Missing => "missing",
            SessionError::Malformed => "malformed",
            SessionError::InvalidSignature => "invalid_signature",
            SessionError::Expired => "expired",
            SessionError::EmptyIdentity => "empty_identity",
        }
    }
}

impl From<SessionError> for AppError {
    fn from(_: SessionError) -> Self {
        AppError::Unauthorized
    }
}

/// Cookie signing keys in priority order
///
/// Sessions are always signed with the first key. Any key verifies, so a
/// key can be retired by moving it to the second slot for one session
/// lifetime before dropping it.
#[derive(Clone)]
pub struct SessionKeys {
    keys: Vec<Vec<u8>>,
}

impl SessionKeys {
    /// Build from keys ordered primary first
    ///
    /// # Errors
    /// Returns error if no key is given or any key is empty
    pub fn new<I, K>(keys: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        let keys: Vec<Vec<u8>> = keys.into_iter().map(|k| k.as_ref().to_vec()).collect();
        if keys.is_empty() || keys.iter().any(Vec::is_empty) {
            return Err(AppError::Config(
                "at least one non-empty cookie signing key is required".to_string(),
            ));
        }
        Ok(Self { keys })
    }

    fn primary(&self) -> &[u8] {
        &self.keys[0]
    }

    fn mac(key: &[u8]) -> Result<HmacSha256, AppError> {
        HmacSha256::new_from_slice(key).map_err(|e| AppError::Encryption(e.to_string()))
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("count", &self.keys.len())
            .finish()
    }
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// # Arguments
/// * `session` - Session data to encode
/// * `keys` - Signing keys; the primary one is used
///
/// # Returns
/// Signed token string
pub fn create_session_token(session: &Session, keys: &SessionKeys) -> Result<String, AppError> {
    let payload = serde_json::to_string(session).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let mut mac = SessionKeys::mac(keys.primary())?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Errors
/// Returns why the token does not authenticate: bad shape, no key
/// matches the signature, expired, or empty user id
pub fn verify_session_token(token: &str, keys: &SessionKeys) -> Result<Session, SessionError> {
    let (payload_b64, signature_b64) = token.split_once('.').ok_or(SessionError::Malformed)?;
    if payload_b64.is_empty() || signature_b64.contains('.') {
        return Err(SessionError::Malformed);
    }

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| SessionError::Malformed)?;

    let signed_by_known_key = keys.keys.iter().any(|key| {
        SessionKeys::mac(key)
            .map(|mut mac| {
                mac.update(payload_b64.as_bytes());
                mac.verify_slice(&signature).is_ok()
            })
            .unwrap_or(false)
    });
    if !signed_by_known_key {
        return Err(SessionError::InvalidSignature);
    }

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| SessionError::Malformed)?;
    let session: Session =
        serde_json::from_slice(&payload).map_err(|_| SessionError::Malformed)?;

    if session.is_expired() {
        return Err(SessionError::Expired);
    }
    if session.user_id.trim().is_empty() {
        return Err(SessionError::EmptyIdentity);
    }

    Ok(session)
}

/// Resolve the session carried by a request's `Cookie` header(s)
///
/// Besides the expiry embedded in the token, the session must have been
/// issued within `max_age_secs`.
pub fn authenticate(
    headers: &HeaderMap,
    keys: &SessionKeys,
    max_age_secs: i64,
) -> Result<Session, SessionError> {
    let jar = CookieJar::from_headers(headers);
    let cookie = jar.get(SESSION_COOKIE).ok_or(SessionError::Missing)?;
    let session = verify_session_token(cookie.value(), keys)?;
    if session.is_older_than(max_age_secs) {
        return Err(SessionError::Expired);
    }
    Ok(session)
}
