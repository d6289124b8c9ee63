use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::AppState;

use super::error::AuthError;
use super::extract::{AuthUser, ClientInfo};
use super::schema::{
    Envelope, LoginRequest, LogoutRequest, MeData, MessageResponse, RefreshData,
    RefreshTokenRequest, RegisterData, RegisterRequest, RegisterResponse, Requires2faData,
    Requires2faResponse, TokenGrant, UserPublic, Verify2faRequest, VerifyBackupCodeRequest,
    VerifyEmailRequest,
};
use super::service::{AuthFlow, IssuedTokens, LoginOutcome};

fn flow(state: &Arc<AppState>) -> AuthFlow<'_> {
    AuthFlow::new(state.db.clone(), &state.jwt_service, &state.security)
}

fn token_grant(
    tokens: IssuedTokens,
    user: &super::model::User,
    warning: Option<String>,
) -> TokenGrant {
    TokenGrant {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        token_type: "Bearer",
        expires_in: tokens.expires_in,
        user: UserPublic::from(user),
        warning,
    }
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AuthError> {
    req.validate()?;

    let (user, raw_token) = flow(&state)
        .register(
            &req.email,
            &req.password,
            &req.name,
            &req.last_name,
            req.role.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "User registered successfully. Please verify your email.",
            data: RegisterData {
                user_id: user.id,
                email: user.email,
                email_verified: user.email_verified,
            },
            dev_verification_token: state.is_development().then_some(raw_token),
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    Json(req): Json<LoginRequest>,
) -> Result<Response, AuthError> {
    let outcome = flow(&state)
        .login(&req.email, &req.password, &client)
        .await?;

    Ok(match outcome {
        LoginOutcome::Authenticated { tokens, user } => (
            StatusCode::OK,
            Json(Envelope::ok(token_grant(tokens, &user, None))),
        )
            .into_response(),
        LoginOutcome::Requires2fa { temp_token } => (
            StatusCode::OK,
            Json(Requires2faResponse {
                success: true,
                requires_2fa: true,
                data: Requires2faData {
                    temp_token,
                    message: "Please provide 2FA code",
                },
            }),
        )
            .into_response(),
    })
}

pub async fn verify_two_factor(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    Json(req): Json<Verify2faRequest>,
) -> Result<Json<Envelope<TokenGrant>>, AuthError> {
    if req.temp_token.trim().is_empty() || req.code.trim().is_empty() {
        return Err(AuthError::validation("Temp token and code are required"));
    }

    let (tokens, user) = flow(&state)
        .verify_two_factor_code(&req.temp_token, &req.code, &client)
        .await?;

    Ok(Json(Envelope::ok(token_grant(tokens, &user, None))))
}

pub async fn verify_backup_code(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    Json(req): Json<VerifyBackupCodeRequest>,
) -> Result<Json<Envelope<TokenGrant>>, AuthError> {
    if req.temp_token.trim().is_empty() || req.backup_code.trim().is_empty() {
        return Err(AuthError::validation(
            "Temp token and backup code are required",
        ));
    }

    let (tokens, user, warning) = flow(&state)
        .verify_backup_code(&req.temp_token, &req.backup_code, &client)
        .await?;

    Ok(Json(Envelope::ok(token_grant(tokens, &user, Some(warning)))))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<Envelope<RefreshData>>, AuthError> {
    if req.refresh_token.is_empty() {
        return Err(AuthError::validation("Refresh token is required"));
    }

    let (access_token, expires_in) = flow(&state).refresh(&req.refresh_token).await?;

    Ok(Json(Envelope::ok(RefreshData {
        access_token,
        token_type: "Bearer",
        expires_in,
    })))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    if req.refresh_token.is_empty() {
        return Err(AuthError::validation("Refresh token is required"));
    }

    flow(&state).logout(&req.refresh_token).await?;

    Ok(Json(MessageResponse::new("Logged out successfully")))
}

pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    if req.token.trim().is_empty() {
        return Err(AuthError::validation("Token is required"));
    }

    flow(&state).verify_email(&req.token).await?;

    Ok(Json(MessageResponse::new("Email verified successfully")))
}

pub async fn me(auth: AuthUser) -> Result<Json<Envelope<MeData>>, AuthError> {
    let user = auth.user;
    Ok(Json(Envelope::ok(MeData {
        active: user.active,
        has_password: user.has_password(),
        user: UserPublic::from(&user),
    })))
}
