//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. `.env` file (if present)
//! 3. Configuration files (config/default.toml, config/local.toml)
//! 4. Environment variables (override)

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (default: 3000)
    pub port: u16,
    /// Public host, optionally with port (e.g., "localhost:3000")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
    pub tls: TlsConfig,
}

impl ServerConfig {
    /// Get the public base URL
    ///
    /// # Returns
    /// Full URL like "https://localhost:3000"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }

    /// Absolute URL the identity provider redirects back to
    pub fn callback_url(&self) -> String {
        format!("{}/auth/google/callback", self.base_url())
    }
}

/// TLS termination settings
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// Serve HTTPS directly instead of plain HTTP
    pub enabled: bool,
    /// PEM certificate chain
    pub cert_path: PathBuf,
    /// PEM private key
    pub key_path: PathBuf,
}

/// Session and identity provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Primary cookie signing key; new sessions are signed with it
    pub cookie_key_1: String,
    /// Secondary cookie signing key, still accepted for verification
    pub cookie_key_2: String,
    /// Session max age in seconds (default: 86400 = 24 hours)
    pub session_max_age: i64,
    pub google: GoogleOAuthConfig,
}

impl AuthConfig {
    /// Signing keys in priority order
    pub fn cookie_keys(&self) -> [&str; 2] {
        [self.cookie_key_1.as_str(), self.cookie_key_2.as_str()]
    }
}

/// Google OAuth configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Authorization endpoint the browser is redirected to
    pub auth_url: String,
    /// Token endpoint for the code exchange
    pub token_url: String,
    /// OpenID userinfo endpoint
    pub userinfo_url: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub fn filter_directives(&self) -> String {
        format!("secretgate={},tower_http=debug", self.level.to_ascii_lowercase())
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/// Upper bound for `auth.session_max_age` (400 days)
pub const MAX_SESSION_MAX_AGE: i64 = 400 * 24 * 60 * 60;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (SECRETGATE__*), including those from `.env`
    ///
    /// # Errors
    /// Returns error if configuration is missing or invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        if let Err(error) = dotenvy::dotenv() {
            if !error.not_found() {
                return Err(crate::error::AppError::Config(format!(
                    "failed to read .env file: {error}"
                )));
            }
        }

        Self::load_with_env(None)
    }

    /// Load configuration, taking `SECRETGATE__*` variables from `env`
    /// instead of the process environment when given
    pub fn load_with_env(
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.domain", "localhost:3000")?
            .set_default("server.protocol", "https")?
            .set_default("server.tls.enabled", true)?
            .set_default("server.tls.cert_path", "cert.pem")?
            .set_default("server.tls.key_path", "key.pem")?
            .set_default("auth.session_max_age", 86400)?
            .set_default("auth.google.auth_url", GOOGLE_AUTH_URL)?
            .set_default("auth.google.token_url", GOOGLE_TOKEN_URL)?
            .set_default("auth.google.userinfo_url", GOOGLE_USERINFO_URL)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("SECRETGATE")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_COOKIE_KEY_BYTES: usize = 32;

        for (name, key) in [
            ("auth.cookie_key_1", &self.auth.cookie_key_1),
            ("auth.cookie_key_2", &self.auth.cookie_key_2),
        ] {
            if key.len() < MIN_COOKIE_KEY_BYTES {
                return Err(crate::error::AppError::Config(format!(
                    "{name} must be at least {MIN_COOKIE_KEY_BYTES} bytes"
                )));
            }
        }

        if self.auth.session_max_age <= 0 || self.auth.session_max_age > MAX_SESSION_MAX_AGE {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_max_age must be between 1 and {MAX_SESSION_MAX_AGE} seconds"
            )));
        }

        if !matches!(self.logging.format.to_ascii_lowercase().as_str(), "pretty" | "json") {
            return Err(crate::error::AppError::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }

        self.logging.level.parse::<tracing::Level>().map_err(|_| {
            crate::error::AppError::Config(format!(
                "logging.level must be one of trace, debug, info, warn, error, got {:?}",
                self.logging.level
            ))
        })?;

        if self.auth.google.client_id.trim().is_empty()
            || self.auth.google.client_secret.trim().is_empty()
        {
            return Err(crate::error::AppError::Config(
                "auth.google.client_id and auth.google.client_secret are required".to_string(),
            ));
        }

        for (name, value) in [
            ("auth.google.auth_url", &self.auth.google.auth_url),
            ("auth.google.token_url", &self.auth.google.token_url),
            ("auth.google.userinfo_url", &self.auth.google.userinfo_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                crate::error::AppError::Config(format!("{name} is not a valid URL: {e}"))
            })?;
        }

        if self.should_use_secure_cookies() && !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.')
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
