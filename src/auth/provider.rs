//! Identity provider client
//!
//! Authorization-code exchange against Google's OAuth 2.0 endpoints.

use axum::async_trait;
use serde::Deserialize;

use crate::config::{GoogleOAuthConfig, ServerConfig};
use crate::error::AppError;

/// Scope requested from the provider
pub const GOOGLE_SCOPE: &str = "email";

/// Identity returned by the provider after a successful exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Provider-assigned user id (`sub`)
    pub id: String,
    pub email: Option<String>,
    pub email_verified: bool,
}

/// A third-party OAuth identity provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is sent to, carrying the CSRF `state`
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange an authorization code for the user's profile
    async fn exchange_code(&self, code: &str) -> Result<Profile, AppError>;
}

/// Google OAuth client
pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
    http: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(config: &GoogleOAuthConfig, server: &ServerConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("SecretGate/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: server.callback_url(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            userinfo_url: config.userinfo_url.clone(),
            http,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorization_url(&self, state: &str) -> String {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", GOOGLE_SCOPE),
            ("state", state),
        ];

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let separator = if self.auth_url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.auth_url, separator, query)
    }

    async fn exchange_code(&self, code: &str) -> Result<Profile, AppError> {
        let token_response = self
            .http
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !token_response.status().is_success() {
            return Err(AppError::Provider(format!(
                "token endpoint returned {}",
                token_response.status()
            )));
        }
        let token: GoogleTokenResponse = token_response.json().await?;

        let userinfo_response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        if !userinfo_response.status().is_success() {
            return Err(AppError::Provider(format!(
                "userinfo endpoint returned {}",
                userinfo_response.status()
            )));
        }
        let user: GoogleUserInfo = userinfo_response.json().await?;

        if user.sub.trim().is_empty() {
            return Err(AppError::Provider(
                "userinfo response has an empty subject".to_string(),
            ));
        }

        Ok(Profile {
            id: user.sub,
            email: user.email,
            email_verified: user.email_verified.unwrap_or(false),
        })
    }
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
}
