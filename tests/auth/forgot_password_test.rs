use axum::http::StatusCode;
use serde_json::json;
use serial_test::serial;

use crate::common::{register_verified_user, TestContext};

#[tokio::test]
#[serial]
async fn reset_request_response_is_identical_for_known_and_unknown_email() {
    let ctx = TestContext::new().await;
    let email = register_verified_user(&ctx).await;

    let known = ctx
        .server
        .post("/auth/password/reset/request")
        .json(&json!({ "email": &email }))
        .await;
    let unknown = ctx
        .server
        .post("/auth/password/reset/request")
        .json(&json!({ "email": "nobody@example.com" }))
        .await;

    known.assert_status(StatusCode::OK);
    unknown.assert_status(StatusCode::OK);

    // Byte-identical apart from the development-only debug token
    let mut a: serde_json::Value = known.json();
    let b: serde_json::Value = unknown.json();
    a.as_object_mut().unwrap().remove("_dev_password_reset_token");
    assert_eq!(a, b);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn reset_request_issues_dev_token_in_development() {
    let ctx = TestContext::new().await;
    let email = register_verified_user(&ctx).await;

    let response = ctx
        .server
        .post("/auth/password/reset/request")
        .json(&json!({ "email": &email }))
        .await;

    let body: serde_json::Value = response.json();
    assert!(body["_dev_password_reset_token"].as_str().is_some());

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn new_reset_request_invalidates_the_previous_token() {
    let ctx = TestContext::new().await;
    let email = register_verified_user(&ctx).await;

    let first: serde_json::Value = ctx
        .server
        .post("/auth/password/reset/request")
        .json(&json!({ "email": &email }))
        .await
        .json();
    let old_token = first["_dev_password_reset_token"].as_str().unwrap();

    ctx.server
        .post("/auth/password/reset/request")
        .json(&json!({ "email": &email }))
        .await;

    let response = ctx
        .server
        .post("/auth/password/reset")
        .json(&json!({ "token": old_token, "new_password": "BrandNewPassword1!" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "INVALID_TOKEN");

    ctx.cleanup().await;
}
