//! Common test utilities for E2E tests

pub mod mock_provider;

use std::path::PathBuf;

use secretgate::{AppState, config};
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub provider: mock_provider::MockProvider,
    /// Follows no redirects and keeps no cookies
    pub client: reqwest::Client,
}

impl TestServer {
    /// Start a mock identity provider and a SecretGate server wired to it
    pub async fn new() -> Self {
        let provider = mock_provider::MockProvider::start().await;

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
                tls: config::TlsConfig {
                    enabled: false,
                    cert_path: PathBuf::from("cert.pem"),
                    key_path: PathBuf::from("key.pem"),
                },
            },
            auth: config::AuthConfig {
                cookie_key_1: "test-cookie-key-number-one-32-bytes".to_string(),
                cookie_key_2: "test-cookie-key-number-two-32-bytes".to_string(),
                session_max_age: 86400,
                google: config::GoogleOAuthConfig {
                    client_id: "test-client-id".to_string(),
                    client_secret: "test-client-secret".to_string(),
                    auth_url: provider.url("/authorize"),
                    token_url: provider.url("/token"),
                    userinfo_url: provider.url("/userinfo"),
                },
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        let state = AppState::new(config).unwrap();

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = secretgate::build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            provider,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Browser-like client: keeps cookies, does not follow redirects
    pub fn browser(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap()
    }

    /// `Cookie` header value carrying `session` signed with the primary key
    pub fn session_cookie(&self, session: &secretgate::auth::Session) -> String {
        let token = secretgate::auth::create_session_token(session, &self.state.session_keys)
            .expect("Failed to create test token");
        format!("session={token}")
    }

    /// Walk `/auth/google` then the callback with `code`; returns the
    /// callback response
    pub async fn login(&self, browser: &reqwest::Client, code: &str) -> reqwest::Response {
        let redirect = browser.get(self.url("/auth/google")).send().await.unwrap();
        assert_eq!(redirect.status(), 302);
        let state = state_param(&redirect);

        browser
            .get(self.url(&format!(
                "/auth/google/callback?code={}&state={}",
                urlencoding::encode(code),
                urlencoding::encode(&state)
            )))
            .send()
            .await
            .unwrap()
    }
}

/// Location header of a redirect response
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

/// `state` query parameter of the provider redirect
pub fn state_param(response: &reqwest::Response) -> String {
    let location = url::Url::parse(&location(response)).expect("absolute provider URL");
    location
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("state parameter")
}
