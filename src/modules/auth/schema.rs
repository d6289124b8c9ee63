use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::model::User;

// =============================================================================
// RESPONSE ENVELOPE
// =============================================================================

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        Self {
            success: true,
            message,
        }
    }
}

// =============================================================================
// PUBLIC USER PROFILE
// =============================================================================

#[derive(Debug, Serialize)]
pub struct UserPublic {
    pub id: String,
    pub email: String,
    pub email_verified: bool,
    pub name: String,
    pub last_name: String,
    pub role: String,
    pub two_factor_enabled: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&User> for UserPublic {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            email_verified: user.email_verified,
            name: user.name.clone(),
            last_name: user.last_name.clone(),
            role: user.role.clone(),
            two_factor_enabled: user.two_factor_enabled,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

// =============================================================================
// REGISTER
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterData {
    pub user_id: String,
    pub email: String,
    pub email_verified: bool,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: &'static str,
    pub data: RegisterData,
    /// Development only: lets flows be exercised without email delivery.
    #[serde(rename = "_dev_verification_token", skip_serializing_if = "Option::is_none")]
    pub dev_verification_token: Option<String>,
}

// =============================================================================
// LOGIN
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserPublic,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Requires2faResponse {
    pub success: bool,
    pub requires_2fa: bool,
    pub data: Requires2faData,
}

#[derive(Debug, Serialize)]
pub struct Requires2faData {
    pub temp_token: String,
    pub message: &'static str,
}

// =============================================================================
// 2FA LOGIN CHALLENGE
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct Verify2faRequest {
    #[serde(default)]
    pub temp_token: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyBackupCodeRequest {
    #[serde(default)]
    pub temp_token: String,
    #[serde(default)]
    pub backup_code: String,
}

// =============================================================================
// REFRESH / LOGOUT
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshData {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: String,
}

// =============================================================================
// EMAIL VERIFICATION
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    #[serde(default)]
    pub token: String,
}

// =============================================================================
// ME (Current User)
// =============================================================================

#[derive(Debug, Serialize)]
pub struct MeData {
    #[serde(flatten)]
    pub user: UserPublic,
    pub active: bool,
    pub has_password: bool,
}
