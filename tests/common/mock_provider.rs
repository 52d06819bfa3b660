//! In-process stand-in for Google's token and userinfo endpoints

use std::collections::HashMap;

use axum::{
    Form, Json, Router,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tokio::net::TcpListener;

/// Code that exchanges for a regular user
pub const GOOD_CODE: &str = "good-code";
/// Code that exchanges for a profile without an id
pub const EMPTY_ID_CODE: &str = "empty-id-code";
/// User id reported for `GOOD_CODE`
pub const USER_ID: &str = "108234567890";

pub struct MockProvider {
    pub addr: String,
}

impl MockProvider {
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/token", post(token))
            .route("/userinfo", get(userinfo));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }
}

async fn token(Form(form): Form<HashMap<String, String>>) -> Response {
    let field = |name: &str| form.get(name).map(String::as_str);

    let valid_client = field("client_id") == Some("test-client-id")
        && field("client_secret") == Some("test-client-secret")
        && field("grant_type") == Some("authorization_code");
    if !valid_client {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid_client" })),
        )
            .into_response();
    }

    let access_token = match field("code") {
        Some(GOOD_CODE) => "token-good",
        Some(EMPTY_ID_CODE) => "token-empty",
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_grant" })),
            )
                .into_response();
        }
    };

    Json(json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3599,
        "scope": "email",
    }))
    .into_response()
}

async fn userinfo(headers: HeaderMap) -> Response {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match bearer {
        Some("token-good") => Json(json!({
            "sub": USER_ID,
            "email": "user@example.com",
            "email_verified": true,
        }))
        .into_response(),
        Some("token-empty") => Json(json!({ "sub": "" })).into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}
