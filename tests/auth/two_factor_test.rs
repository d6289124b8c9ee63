use axum::http::StatusCode;
use serde_json::json;
use serial_test::serial;

use crate::common::{register_verified_user, test_password, TestContext};

/// Computes the current TOTP code for a base32 secret, the same way an
/// authenticator app would.
pub fn totp_code(secret_base32: &str) -> String {
    let secret = totp_rs::Secret::Encoded(secret_base32.to_string())
        .to_bytes()
        .expect("invalid test secret");
    let totp = totp_rs::TOTP::new(
        totp_rs::Algorithm::SHA1,
        6,
        1,
        30,
        secret,
        Some("RedOrange".to_string()),
        "test".to_string(),
    )
    .expect("invalid TOTP parameters");
    totp.generate_current().expect("clock error")
}

pub async fn login_access_token(ctx: &TestContext, email: &str) -> String {
    let response = ctx
        .server
        .post("/auth/login")
        .json(&json!({
            "email": email,
            "password": test_password()
        }))
        .await;
    let body: serde_json::Value = response.json();
    body["data"]["access_token"].as_str().unwrap().to_string()
}

/// Full enrollment: register + verify email, log in, enable and confirm 2FA.
/// Returns the email, the shared secret and the raw backup codes.
pub async fn setup_two_factor(ctx: &TestContext) -> (String, String, Vec<String>) {
    let email = register_verified_user(ctx).await;
    let access_token = login_access_token(ctx, &email).await;

    let enable = ctx
        .server
        .post("/auth/2fa/enable")
        .authorization_bearer(&access_token)
        .await;
    enable.assert_status(StatusCode::OK);

    let body: serde_json::Value = enable.json();
    let secret = body["data"]["secret"].as_str().unwrap().to_string();
    let setup_token = body["data"]["setup_token"].as_str().unwrap().to_string();
    let backup_codes: Vec<String> = body["data"]["backup_codes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap().to_string())
        .collect();

    let verify = ctx
        .server
        .post("/auth/2fa/verify-enable")
        .authorization_bearer(&access_token)
        .json(&json!({
            "setup_token": setup_token,
            "code": totp_code(&secret)
        }))
        .await;
    verify.assert_status(StatusCode::OK);

    (email, secret, backup_codes)
}

/// Logs in a 2FA user up to the challenge and returns the temp token.
pub async fn login_temp_token(ctx: &TestContext, email: &str) -> String {
    let response = ctx
        .server
        .post("/auth/login")
        .json(&json!({
            "email": email,
            "password": test_password()
        }))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["requires_2fa"], true);
    body["data"]["temp_token"].as_str().unwrap().to_string()
}

#[tokio::test]
#[serial]
async fn enable_2fa_returns_setup_material() {
    let ctx = TestContext::new().await;
    let email = register_verified_user(&ctx).await;
    let access_token = login_access_token(&ctx, &email).await;

    let response = ctx
        .server
        .post("/auth/2fa/enable")
        .authorization_bearer(&access_token)
        .await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert!(body["data"]["secret"].as_str().is_some());
    assert!(body["data"]["otpauth_url"]
        .as_str()
        .unwrap()
        .starts_with("otpauth://totp/"));
    assert!(body["data"]["setup_token"].as_str().is_some());
    assert_eq!(body["data"]["backup_codes"].as_array().unwrap().len(), 10);

    // Nothing is enabled yet; login still goes straight through
    let login: serde_json::Value = ctx
        .server
        .post("/auth/login")
        .json(&json!({ "email": &email, "password": test_password() }))
        .await
        .json();
    assert!(login["data"]["access_token"].as_str().is_some());

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn enable_2fa_without_auth_returns_unauthorized() {
    let ctx = TestContext::new().await;

    let response = ctx.server.post("/auth/2fa/enable").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn verify_enable_with_wrong_code_does_not_enable() {
    let ctx = TestContext::new().await;
    let email = register_verified_user(&ctx).await;
    let access_token = login_access_token(&ctx, &email).await;

    let enable: serde_json::Value = ctx
        .server
        .post("/auth/2fa/enable")
        .authorization_bearer(&access_token)
        .await
        .json();
    let setup_token = enable["data"]["setup_token"].as_str().unwrap();

    let response = ctx
        .server
        .post("/auth/2fa/verify-enable")
        .authorization_bearer(&access_token)
        .json(&json!({
            "setup_token": setup_token,
            "code": "000000"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "INVALID_CODE");

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn completed_enrollment_turns_login_into_challenge() {
    let ctx = TestContext::new().await;
    let (email, secret, _) = setup_two_factor(&ctx).await;

    let temp_token = login_temp_token(&ctx, &email).await;

    let response = ctx
        .server
        .post("/auth/2fa/verify")
        .json(&json!({
            "temp_token": temp_token,
            "code": totp_code(&secret)
        }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert!(body["data"]["access_token"].as_str().is_some());
    assert!(body["data"]["refresh_token"].as_str().is_some());
    assert_eq!(body["data"]["user"]["two_factor_enabled"], true);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn enable_when_already_enabled_returns_bad_request() {
    let ctx = TestContext::new().await;
    let (email, secret, _) = setup_two_factor(&ctx).await;

    let temp_token = login_temp_token(&ctx, &email).await;
    let verified: serde_json::Value = ctx
        .server
        .post("/auth/2fa/verify")
        .json(&json!({ "temp_token": temp_token, "code": totp_code(&secret) }))
        .await
        .json();
    let access_token = verified["data"]["access_token"].as_str().unwrap();

    let response = ctx
        .server
        .post("/auth/2fa/enable")
        .authorization_bearer(access_token)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "2FA_ALREADY_ENABLED");

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn temp_token_is_rejected_on_access_protected_endpoints() {
    let ctx = TestContext::new().await;
    let (email, _, _) = setup_two_factor(&ctx).await;

    let temp_token = login_temp_token(&ctx, &email).await;

    let response = ctx
        .server
        .get("/auth/me")
        .authorization_bearer(&temp_token)
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "INVALID_TOKEN_TYPE");

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn access_token_is_rejected_by_challenge_endpoint() {
    let ctx = TestContext::new().await;
    let email = register_verified_user(&ctx).await;
    let access_token = login_access_token(&ctx, &email).await;

    let response = ctx
        .server
        .post("/auth/2fa/verify")
        .json(&json!({
            "temp_token": access_token,
            "code": "123456"
        }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "INVALID_TOKEN_TYPE");

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn challenge_throttles_after_three_failed_codes() {
    let ctx = TestContext::new().await;
    let (email, secret, _) = setup_two_factor(&ctx).await;

    let temp_token = login_temp_token(&ctx, &email).await;

    for attempt in 0..3 {
        let response = ctx
            .server
            .post("/auth/2fa/verify")
            .json(&json!({ "temp_token": &temp_token, "code": "000000" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: serde_json::Value = response.json();
        assert_eq!(body["error_code"], "INVALID_CODE");
        assert_eq!(body["attempts_remaining"], 2 - attempt);
    }

    // The window is exhausted; even the correct code is refused now
    let response = ctx
        .server
        .post("/auth/2fa/verify")
        .json(&json!({ "temp_token": &temp_token, "code": totp_code(&secret) }))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "TOO_MANY_ATTEMPTS");

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn disable_2fa_requires_password_and_code() {
    let ctx = TestContext::new().await;
    let (email, secret, _) = setup_two_factor(&ctx).await;

    let temp_token = login_temp_token(&ctx, &email).await;
    let verified: serde_json::Value = ctx
        .server
        .post("/auth/2fa/verify")
        .json(&json!({ "temp_token": temp_token, "code": totp_code(&secret) }))
        .await
        .json();
    let access_token = verified["data"]["access_token"].as_str().unwrap().to_string();

    let wrong_password = ctx
        .server
        .post("/auth/2fa/disable")
        .authorization_bearer(&access_token)
        .json(&json!({ "password": "WrongPassword123!", "code": totp_code(&secret) }))
        .await;
    wrong_password.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = wrong_password.json();
    assert_eq!(body["error_code"], "INVALID_PASSWORD");

    let response = ctx
        .server
        .post("/auth/2fa/disable")
        .authorization_bearer(&access_token)
        .json(&json!({ "password": test_password(), "code": totp_code(&secret) }))
        .await;
    response.assert_status(StatusCode::OK);

    // Login no longer challenges
    let login: serde_json::Value = ctx
        .server
        .post("/auth/login")
        .json(&json!({ "email": &email, "password": test_password() }))
        .await
        .json();
    assert!(login["data"]["access_token"].as_str().is_some());

    ctx.cleanup().await;
}
