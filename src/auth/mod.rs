//! Google OAuth authentication
//!
//! Handles:
//! - Google OAuth flow
//! - Signed cookie sessions
//! - Session gate middleware

mod middleware;
mod oauth;
pub mod provider;
pub mod session;

pub use middleware::{CurrentUser, require_session};
pub use oauth::auth_router;
pub use provider::{GoogleProvider, IdentityProvider, Profile};
pub use session::{
    Session, SessionError, SessionKeys, authenticate, create_session_token, verify_session_token,
};
