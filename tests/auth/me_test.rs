use axum::http::StatusCode;
use serial_test::serial;

use crate::common::{login_user, register_verified_user, TestContext};

#[tokio::test]
#[serial]
async fn me_returns_the_current_profile() {
    let ctx = TestContext::new().await;
    let email = register_verified_user(&ctx).await;
    let login = login_user(&ctx, &email).await;
    let access_token = login["data"]["access_token"].as_str().unwrap();

    let response = ctx
        .server
        .get("/auth/me")
        .authorization_bearer(access_token)
        .await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["data"]["email"], email);
    assert_eq!(body["data"]["email_verified"], true);
    assert_eq!(body["data"]["role"], "support");
    assert_eq!(body["data"]["has_password"], true);
    assert_eq!(body["data"]["active"], true);
    assert!(body["data"]["last_login_at"].as_str().is_some());

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn me_without_token_returns_unauthorized() {
    let ctx = TestContext::new().await;

    let response = ctx.server.get("/auth/me").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn me_with_malformed_token_returns_unauthorized() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .get("/auth/me")
        .authorization_bearer("garbage.token.here")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "INVALID_TOKEN");

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn me_ignores_token_without_bearer_scheme() {
    let ctx = TestContext::new().await;
    let email = register_verified_user(&ctx).await;
    let login = login_user(&ctx, &email).await;
    let access_token = login["data"]["access_token"].as_str().unwrap();

    let response = ctx
        .server
        .get("/auth/me")
        .add_header(
            axum::http::HeaderName::from_static("authorization"),
            axum::http::HeaderValue::from_str(access_token).unwrap(),
        )
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);

    ctx.cleanup().await;
}
