use axum::http::StatusCode;
use serde_json::json;
use serial_test::serial;

use crate::common::{login_user, register_verified_user, TestContext};

#[tokio::test]
#[serial]
async fn refresh_returns_new_access_token() {
    let ctx = TestContext::new().await;
    let email = register_verified_user(&ctx).await;
    let login = login_user(&ctx, &email).await;
    let refresh_token = login["data"]["refresh_token"].as_str().unwrap();

    let response = ctx
        .server
        .post("/auth/refresh")
        .json(&json!({ "refresh_token": refresh_token }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert!(body["data"]["access_token"].as_str().is_some());
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert!(body["data"]["expires_in"].as_i64().unwrap() > 0);
    // Refresh does not rotate the grant; no new refresh token is issued
    assert!(body["data"].get("refresh_token").is_none());

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn refresh_with_access_token_is_rejected() {
    let ctx = TestContext::new().await;
    let email = register_verified_user(&ctx).await;
    let login = login_user(&ctx, &email).await;
    let access_token = login["data"]["access_token"].as_str().unwrap();

    let response = ctx
        .server
        .post("/auth/refresh")
        .json(&json!({ "refresh_token": access_token }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "INVALID_TOKEN_TYPE");

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn refresh_with_garbage_token_is_rejected() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/auth/refresh")
        .json(&json!({ "refresh_token": "not-a-real-token" }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "INVALID_TOKEN");

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn refresh_fails_after_session_revoked_via_revoke_all() {
    let ctx = TestContext::new().await;
    let email = register_verified_user(&ctx).await;
    let login = login_user(&ctx, &email).await;
    let access_token = login["data"]["access_token"].as_str().unwrap();
    let refresh_token = login["data"]["refresh_token"].as_str().unwrap();

    let revoke = ctx
        .server
        .post("/auth/sessions/revoke-all")
        .authorization_bearer(access_token)
        .json(&json!({ "include_current": true }))
        .await;
    revoke.assert_status(StatusCode::OK);

    let response = ctx
        .server
        .post("/auth/refresh")
        .json(&json!({ "refresh_token": refresh_token }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "SESSION_INVALID");

    ctx.cleanup().await;
}
