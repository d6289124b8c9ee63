use axum::{extract::State, Json};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::modules::auth::error::AuthError;
use crate::modules::auth::extract::AuthUser;
use crate::modules::auth::schema::MessageResponse;
use crate::AppState;

use super::schema::{
    ChangePasswordRequest, RequestResetRequest, RequestResetResponse, ResetPasswordRequest,
    SetPasswordRequest,
};
use super::service::PasswordFlow;

fn flow(state: &Arc<AppState>) -> PasswordFlow<'_> {
    PasswordFlow::new(state.db.clone(), &state.security)
}

pub async fn change(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    let mut details = Map::new();
    if req.current_password.trim().is_empty() {
        details.insert(
            "current_password".to_string(),
            json!("Current password is required"),
        );
    }
    if req.new_password.len() < state.security.min_password_len {
        details.insert(
            "new_password".to_string(),
            json!("New password must be at least 8 characters"),
        );
    }
    if !details.is_empty() {
        return Err(AuthError::Validation {
            message: "Validation error".to_string(),
            details: Some(Value::Object(details)),
        });
    }

    flow(&state)
        .change(&auth.user, &req.current_password, &req.new_password)
        .await?;

    Ok(Json(MessageResponse::new("Password changed successfully")))
}

pub async fn set(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<SetPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    if req.password.len() < state.security.min_password_len {
        return Err(AuthError::validation(
            "Password must be at least 8 characters",
        ));
    }

    flow(&state).set(&auth.user, &req.password).await?;

    Ok(Json(MessageResponse::new("Password set successfully")))
}

pub async fn request_reset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RequestResetRequest>,
) -> Result<Json<RequestResetResponse>, AuthError> {
    let issued = flow(&state).request_reset(&req.email).await?;

    Ok(Json(RequestResetResponse {
        success: true,
        message: "If the email exists, a password reset link has been sent",
        dev_reset_token: issued.filter(|_| state.is_development()),
    }))
}

pub async fn reset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    let mut details = Map::new();
    if req.token.trim().is_empty() {
        details.insert("token".to_string(), json!("Token is required"));
    }
    if req.new_password.len() < state.security.min_password_len {
        details.insert(
            "new_password".to_string(),
            json!("Password must be at least 8 characters"),
        );
    }
    if !details.is_empty() {
        return Err(AuthError::Validation {
            message: "Validation error".to_string(),
            details: Some(Value::Object(details)),
        });
    }

    flow(&state).reset(&req.token, &req.new_password).await?;

    Ok(Json(MessageResponse::new("Password reset successfully")))
}
