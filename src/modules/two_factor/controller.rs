use axum::{extract::State, Json};
use std::sync::Arc;

use crate::modules::auth::error::AuthError;
use crate::modules::auth::extract::AuthUser;
use crate::modules::auth::schema::{Envelope, MessageResponse};
use crate::AppState;

use super::schema::{
    BackupStatusData, Disable2faRequest, Enable2faData, RegenerateBackupData,
    RegenerateBackupRequest, VerifyEnableRequest,
};
use super::service::TwoFactorFlow;

fn flow(state: &Arc<AppState>) -> TwoFactorFlow<'_> {
    TwoFactorFlow::new(state.db.clone(), &state.security)
}

pub async fn enable(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Envelope<Enable2faData>>, AuthError> {
    let enrollment = flow(&state).begin_enroll(&auth.user).await?;

    Ok(Json(Envelope::ok(Enable2faData {
        secret: enrollment.secret,
        otpauth_url: enrollment.otpauth_url,
        setup_token: enrollment.setup_token,
        backup_codes: enrollment.backup_codes,
    })))
}

pub async fn verify_enable(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<VerifyEnableRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    if req.setup_token.trim().is_empty() || req.code.trim().is_empty() {
        return Err(AuthError::validation("Setup token and code are required"));
    }

    flow(&state)
        .complete_enroll(&auth.user, &req.setup_token, &req.code)
        .await?;

    Ok(Json(MessageResponse::new(
        "Two-factor authentication enabled successfully",
    )))
}

pub async fn disable(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<Disable2faRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    if req.password.trim().is_empty() || req.code.trim().is_empty() {
        return Err(AuthError::validation("Password and 2FA code are required"));
    }

    flow(&state)
        .disable(&auth.user, &req.password, &req.code)
        .await?;

    Ok(Json(MessageResponse::new("Two-factor authentication disabled")))
}

pub async fn regenerate_backup(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<RegenerateBackupRequest>,
) -> Result<Json<Envelope<RegenerateBackupData>>, AuthError> {
    if req.code.trim().is_empty() {
        return Err(AuthError::validation("2FA code is required"));
    }

    let backup_codes = flow(&state)
        .regenerate_backup_codes(&auth.user, &req.code)
        .await?;

    Ok(Json(Envelope::ok(RegenerateBackupData { backup_codes })))
}

pub async fn backup_status(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Envelope<BackupStatusData>>, AuthError> {
    let status = flow(&state).backup_code_status(&auth.user).await?;

    Ok(Json(Envelope::ok(BackupStatusData {
        total_codes: status.total,
        used_codes: status.used,
        remaining_codes: status.remaining,
    })))
}
