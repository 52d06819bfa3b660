//! E2E tests for the Google OAuth flow and the session gate

mod common;

use chrono::{Duration, Utc};
use common::mock_provider::{EMPTY_ID_CODE, GOOD_CODE, USER_ID};
use common::{TestServer, location};
use secretgate::auth::{Session, SessionKeys, create_session_token};

const SECRET: &str = "Your personal secret value is 42!";

async fn assert_login_required(response: reqwest::Response) {
    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body, serde_json::json!({ "error": "You must log in!" }));
}

#[tokio::test]
async fn test_google_redirect_points_at_provider() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/auth/google"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 302);
    let location = location(&response);
    assert!(location.starts_with(&server.provider.url("/authorize?")));
    assert!(location.contains("client_id=test-client-id"));
    assert!(location.contains("scope=email"));
    assert!(location.contains("response_type=code"));
    assert!(location.contains("state="));

    let set_cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie header");
    assert!(set_cookie.contains("oauth_state="));
}

#[tokio::test]
async fn test_login_then_secret_then_logout() {
    let server = TestServer::new().await;
    let browser = server.browser();

    let callback = server.login(&browser, GOOD_CODE).await;
    assert_eq!(callback.status(), 302);
    assert_eq!(location(&callback), "/");

    let secret = browser.get(server.url("/secret")).send().await.unwrap();
    assert_eq!(secret.status(), 200);
    assert_eq!(secret.text().await.unwrap(), SECRET);

    let logout = browser.get(server.url("/auth/logout")).send().await.unwrap();
    assert_eq!(logout.status(), 302);
    assert_eq!(location(&logout), "/");

    let after = browser.get(server.url("/secret")).send().await.unwrap();
    assert_login_required(after).await;
}

#[tokio::test]
async fn test_session_cookie_carries_provider_id() {
    let server = TestServer::new().await;
    let browser = server.browser();

    let callback = server.login(&browser, GOOD_CODE).await;
    let session_cookie = callback
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .expect("session cookie")
        .to_string();

    let token = session_cookie
        .trim_start_matches("session=")
        .split(';')
        .next()
        .unwrap();
    let session = secretgate::auth::verify_session_token(token, &server.state.session_keys)
        .expect("cookie verifies");
    assert_eq!(session.user_id, USER_ID);
    assert!(session_cookie.contains("Max-Age=86400"));
    assert!(session_cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_provider_reported_failure_redirects_to_failure() {
    let server = TestServer::new().await;
    let browser = server.browser();

    let redirect = browser.get(server.url("/auth/google")).send().await.unwrap();
    let state = common::state_param(&redirect);

    let response = browser
        .get(server.url(&format!(
            "/auth/google/callback?error=access_denied&state={state}"
        )))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/failure");

    let secret = browser.get(server.url("/secret")).send().await.unwrap();
    assert_login_required(secret).await;
}

#[tokio::test]
async fn test_rejected_code_redirects_to_failure() {
    let server = TestServer::new().await;
    let browser = server.browser();

    let response = server.login(&browser, "expired-code").await;

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/failure");
}

#[tokio::test]
async fn test_profile_without_id_redirects_to_failure() {
    let server = TestServer::new().await;
    let browser = server.browser();

    let response = server.login(&browser, EMPTY_ID_CODE).await;

    assert_eq!(location(&response), "/failure");
}

#[tokio::test]
async fn test_callback_without_state_cookie_redirects_to_failure() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url(&format!(
            "/auth/google/callback?code={GOOD_CODE}&state=guessed"
        )))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/failure");
}

#[tokio::test]
async fn test_secret_without_session_is_unauthorized() {
    let server = TestServer::new().await;

    let response = server.client.get(server.url("/secret")).send().await.unwrap();

    assert_login_required(response).await;
}

#[tokio::test]
async fn test_secret_with_valid_session() {
    let server = TestServer::new().await;
    let cookie = server.session_cookie(&Session::new("user-1", 86_400));

    let response = server
        .client
        .get(server.url("/secret"))
        .header("Cookie", cookie)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), SECRET);
}

#[tokio::test]
async fn test_session_older_than_a_day_is_unauthorized() {
    let server = TestServer::new().await;
    let mut session = Session::new("user-1", 86_400);
    session.created_at = Utc::now() - Duration::hours(25);
    session.expires_at = session.created_at + Duration::hours(24);

    let response = server
        .client
        .get(server.url("/secret"))
        .header("Cookie", server.session_cookie(&session))
        .send()
        .await
        .unwrap();

    assert_login_required(response).await;
}

#[tokio::test]
async fn test_session_signed_with_secondary_key_is_accepted() {
    let server = TestServer::new().await;
    let secondary = SessionKeys::new([&server.state.config.auth.cookie_key_2]).unwrap();
    let token = create_session_token(&Session::new("user-1", 3600), &secondary).unwrap();

    let response = server
        .client
        .get(server.url("/secret"))
        .header("Cookie", format!("session={token}"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_session_signed_with_unknown_key_is_unauthorized() {
    let server = TestServer::new().await;
    let foreign = SessionKeys::new(["someone-elses-cookie-key-32-bytes!!"]).unwrap();
    let token = create_session_token(&Session::new("user-1", 3600), &foreign).unwrap();

    let response = server
        .client
        .get(server.url("/secret"))
        .header("Cookie", format!("session={token}"))
        .send()
        .await
        .unwrap();

    assert_login_required(response).await;
}

#[tokio::test]
async fn test_logout_clears_session_cookie() {
    let server = TestServer::new().await;
    let cookie = server.session_cookie(&Session::new("user-1", 86_400));

    let response = server
        .client
        .get(server.url("/auth/logout"))
        .header("Cookie", cookie)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");
    let set_cookie_values: Vec<String> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(ToString::to_string))
        .collect();
    assert!(
        set_cookie_values
            .iter()
            .any(|v| v.starts_with("session=;") && v.contains("Max-Age=0")),
        "expected cookie removal header, got: {set_cookie_values:?}"
    );
}

#[tokio::test]
async fn test_logout_without_session_redirects_home() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/auth/logout"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), "/");
}
