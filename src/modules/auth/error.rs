use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::services::jwt::TokenError;

/// Failure taxonomy for the whole auth surface. Every variant carries exactly
/// what the client is allowed to learn; audit detail goes to the
/// login-attempt trail instead.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    // Credential verification. The message is identical for unknown email
    // and wrong password so accounts cannot be enumerated.
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Account temporarily locked due to multiple failed attempts")]
    AccountLocked { locked_until: DateTime<Utc> },
    #[error("Please verify your email before logging in")]
    EmailNotVerified,
    #[error("Account is deactivated")]
    AccountInactive,
    #[error("Email already registered")]
    EmailAlreadyExists,

    // Single-use verification tokens (email, reset, 2FA setup).
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Token has expired")]
    TokenExpired,

    // Signed bearer tokens.
    #[error("Invalid or expired token")]
    BearerInvalid,
    #[error("Token has expired")]
    BearerExpired,
    #[error("Invalid token type")]
    InvalidTokenType,
    #[error("Authorization required")]
    Unauthorized,
    #[error("User not found")]
    UserNotFound,

    // Sessions.
    #[error("Session not found or revoked")]
    SessionInvalid,
    #[error("Session expired")]
    SessionExpired,
    #[error("Session not found")]
    SessionNotFound,
    #[error("Session is already revoked")]
    AlreadyRevoked,

    // Two-factor.
    #[error("Two-factor authentication is not enabled")]
    TwoFactorNotEnabled,
    #[error("Two-factor authentication is already enabled")]
    TwoFactorAlreadyEnabled,
    #[error("Invalid 2FA code")]
    InvalidCode { attempts_remaining: Option<i64> },
    #[error("Too many failed 2FA attempts. Please try again later.")]
    TooManyAttempts,
    #[error("Invalid or already used backup code")]
    InvalidBackupCode,

    // Password lifecycle.
    #[error("Current password is incorrect")]
    InvalidPassword,
    #[error("No password set for this account")]
    NoPasswordSet,
    #[error("Password already set. Use the change password endpoint instead.")]
    PasswordAlreadySet,
    #[error("Email already verified")]
    AlreadyVerified,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn validation(message: impl Into<String>) -> Self {
        AuthError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation { .. } => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::AccountLocked { .. } => StatusCode::LOCKED,
            AuthError::EmailNotVerified => StatusCode::UNAUTHORIZED,
            AuthError::AccountInactive => StatusCode::UNAUTHORIZED,
            AuthError::EmailAlreadyExists => StatusCode::CONFLICT,
            AuthError::InvalidToken => StatusCode::BAD_REQUEST,
            AuthError::TokenExpired => StatusCode::BAD_REQUEST,
            AuthError::BearerInvalid => StatusCode::UNAUTHORIZED,
            AuthError::BearerExpired => StatusCode::UNAUTHORIZED,
            AuthError::InvalidTokenType => StatusCode::UNAUTHORIZED,
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::SessionInvalid => StatusCode::UNAUTHORIZED,
            AuthError::SessionExpired => StatusCode::UNAUTHORIZED,
            AuthError::SessionNotFound => StatusCode::NOT_FOUND,
            AuthError::AlreadyRevoked => StatusCode::BAD_REQUEST,
            AuthError::TwoFactorNotEnabled => StatusCode::BAD_REQUEST,
            AuthError::TwoFactorAlreadyEnabled => StatusCode::BAD_REQUEST,
            AuthError::InvalidCode { .. } => StatusCode::BAD_REQUEST,
            AuthError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            AuthError::InvalidBackupCode => StatusCode::BAD_REQUEST,
            AuthError::InvalidPassword => StatusCode::BAD_REQUEST,
            AuthError::NoPasswordSet => StatusCode::BAD_REQUEST,
            AuthError::PasswordAlreadySet => StatusCode::BAD_REQUEST,
            AuthError::AlreadyVerified => StatusCode::BAD_REQUEST,
            AuthError::Database(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Validation { .. } => "VALIDATION_ERROR",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::AccountLocked { .. } => "ACCOUNT_LOCKED",
            AuthError::EmailNotVerified => "EMAIL_NOT_VERIFIED",
            AuthError::AccountInactive => "ACCOUNT_INACTIVE",
            AuthError::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::BearerInvalid => "INVALID_TOKEN",
            AuthError::BearerExpired => "TOKEN_EXPIRED",
            AuthError::InvalidTokenType => "INVALID_TOKEN_TYPE",
            AuthError::Unauthorized => "UNAUTHORIZED",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::SessionInvalid => "SESSION_INVALID",
            AuthError::SessionExpired => "SESSION_EXPIRED",
            AuthError::SessionNotFound => "SESSION_NOT_FOUND",
            AuthError::AlreadyRevoked => "ALREADY_REVOKED",
            AuthError::TwoFactorNotEnabled => "2FA_NOT_ENABLED",
            AuthError::TwoFactorAlreadyEnabled => "2FA_ALREADY_ENABLED",
            AuthError::InvalidCode { .. } => "INVALID_CODE",
            AuthError::TooManyAttempts => "TOO_MANY_ATTEMPTS",
            AuthError::InvalidBackupCode => "INVALID_BACKUP_CODE",
            AuthError::InvalidPassword => "INVALID_PASSWORD",
            AuthError::NoPasswordSet => "NO_PASSWORD_SET",
            AuthError::PasswordAlreadySet => "PASSWORD_ALREADY_SET",
            AuthError::AlreadyVerified => "ALREADY_VERIFIED",
            AuthError::Database(_) | AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(e: validator::ValidationErrors) -> Self {
        AuthError::Validation {
            message: "Validation error".to_string(),
            details: serde_json::to_value(&e).ok(),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AuthError::BearerExpired,
            TokenError::WrongType => AuthError::InvalidTokenType,
            TokenError::Invalid => AuthError::BearerInvalid,
            TokenError::Signing(err) => AuthError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Storage and internal failures are logged server-side and surfaced
        // generically; everything else is already client-safe.
        let message = match &self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "Internal server error".to_string()
            }
            AuthError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "success": false,
            "error": message,
            "error_code": self.error_code(),
        });

        match &self {
            AuthError::AccountLocked { locked_until } => {
                body["locked_until"] = json!(locked_until);
            }
            AuthError::InvalidCode {
                attempts_remaining: Some(remaining),
            } => {
                body["attempts_remaining"] = json!(remaining);
            }
            AuthError::Validation {
                details: Some(details),
                ..
            } => {
                body["details"] = details.clone();
            }
            _ => {}
        }

        (self.status_code(), Json(body)).into_response()
    }
}
