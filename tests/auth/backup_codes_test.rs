use axum::http::StatusCode;
use futures::future::join_all;
use serde_json::json;
use serial_test::serial;

use crate::auth::two_factor_test::{login_temp_token, setup_two_factor, totp_code};
use crate::common::TestContext;

#[tokio::test]
#[serial]
async fn backup_code_completes_login_exactly_once() {
    let ctx = TestContext::new().await;
    let (email, _, backup_codes) = setup_two_factor(&ctx).await;

    let temp_token = login_temp_token(&ctx, &email).await;
    let code = &backup_codes[0];

    let response = ctx
        .server
        .post("/auth/2fa/verify-backup")
        .json(&json!({ "temp_token": &temp_token, "backup_code": code }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert!(body["data"]["access_token"].as_str().is_some());
    assert!(body["data"]["warning"]
        .as_str()
        .unwrap()
        .contains("cannot be reused"));

    // The same code is now inert
    let temp_token = login_temp_token(&ctx, &email).await;
    let replay = ctx
        .server
        .post("/auth/2fa/verify-backup")
        .json(&json!({ "temp_token": &temp_token, "backup_code": code }))
        .await;

    replay.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = replay.json();
    assert_eq!(body["error_code"], "INVALID_BACKUP_CODE");

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn backup_code_accepts_lowercase_and_undashed_input() {
    let ctx = TestContext::new().await;
    let (email, _, backup_codes) = setup_two_factor(&ctx).await;

    let temp_token = login_temp_token(&ctx, &email).await;
    let sloppy = backup_codes[1].replace('-', "").to_lowercase();

    let response = ctx
        .server
        .post("/auth/2fa/verify-backup")
        .json(&json!({ "temp_token": &temp_token, "backup_code": sloppy }))
        .await;

    response.assert_status(StatusCode::OK);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn concurrent_redemptions_of_one_code_yield_one_success() {
    let ctx = TestContext::new().await;
    let (email, _, backup_codes) = setup_two_factor(&ctx).await;

    let temp_token = login_temp_token(&ctx, &email).await;
    let code = &backup_codes[0];

    let requests = (0..4).map(|_| {
        let request = ctx
            .server
            .post("/auth/2fa/verify-backup")
            .json(&json!({ "temp_token": &temp_token, "backup_code": code }));
        async move { request.await }
    });
    let responses = join_all(requests).await;

    let successes = responses
        .iter()
        .filter(|r| r.status_code() == StatusCode::OK)
        .count();
    let rejections = responses
        .iter()
        .filter(|r| r.status_code() == StatusCode::BAD_REQUEST)
        .count();

    assert_eq!(successes, 1);
    assert_eq!(rejections, 3);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn backup_status_tracks_used_codes() {
    let ctx = TestContext::new().await;
    let (email, secret, backup_codes) = setup_two_factor(&ctx).await;

    let temp_token = login_temp_token(&ctx, &email).await;
    let login: serde_json::Value = ctx
        .server
        .post("/auth/2fa/verify-backup")
        .json(&json!({ "temp_token": &temp_token, "backup_code": &backup_codes[0] }))
        .await
        .json();
    let access_token = login["data"]["access_token"].as_str().unwrap();

    let response = ctx
        .server
        .get("/auth/2fa/backup/status")
        .authorization_bearer(access_token)
        .await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["data"]["total_codes"], 10);
    assert_eq!(body["data"]["used_codes"], 1);
    assert_eq!(body["data"]["remaining_codes"], 9);

    // Regeneration needs a live TOTP code and replaces the whole batch
    let regen = ctx
        .server
        .post("/auth/2fa/backup/regenerate")
        .authorization_bearer(access_token)
        .json(&json!({ "code": totp_code(&secret) }))
        .await;
    regen.assert_status(StatusCode::OK);
    let regen_body: serde_json::Value = regen.json();
    let new_codes = regen_body["data"]["backup_codes"].as_array().unwrap();
    assert_eq!(new_codes.len(), 10);

    let status: serde_json::Value = ctx
        .server
        .get("/auth/2fa/backup/status")
        .authorization_bearer(access_token)
        .await
        .json();
    assert_eq!(status["data"]["used_codes"], 0);
    assert_eq!(status["data"]["remaining_codes"], 10);

    // Codes from the old batch are gone
    let temp_token = login_temp_token(&ctx, &email).await;
    let old_code = ctx
        .server
        .post("/auth/2fa/verify-backup")
        .json(&json!({ "temp_token": &temp_token, "backup_code": &backup_codes[1] }))
        .await;
    old_code.assert_status(StatusCode::BAD_REQUEST);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn low_remaining_codes_surface_a_warning() {
    let ctx = TestContext::new().await;
    let (email, _, backup_codes) = setup_two_factor(&ctx).await;

    // Burn codes until only three remain
    for code in backup_codes.iter().take(7) {
        let temp_token = login_temp_token(&ctx, &email).await;
        let response = ctx
            .server
            .post("/auth/2fa/verify-backup")
            .json(&json!({ "temp_token": &temp_token, "backup_code": code }))
            .await;
        response.assert_status(StatusCode::OK);
    }

    let temp_token = login_temp_token(&ctx, &email).await;
    let response = ctx
        .server
        .post("/auth/2fa/verify-backup")
        .json(&json!({ "temp_token": &temp_token, "backup_code": &backup_codes[7] }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    let warning = body["data"]["warning"].as_str().unwrap();
    assert!(warning.contains("2 backup codes remaining"));

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
async fn backup_status_requires_two_factor_enabled() {
    let ctx = TestContext::new().await;
    let email = crate::common::register_verified_user(&ctx).await;
    let access_token =
        crate::auth::two_factor_test::login_access_token(&ctx, &email).await;

    let response = ctx
        .server
        .get("/auth/2fa/backup/status")
        .authorization_bearer(&access_token)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "2FA_NOT_ENABLED");

    ctx.cleanup().await;
}
