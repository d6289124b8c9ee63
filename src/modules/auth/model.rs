use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub email_verified: bool,
    /// Absent for accounts provisioned through an external identity provider
    /// that never set a local password.
    pub password_hash: Option<String>,
    pub name: String,
    pub last_name: String,
    pub role: String,
    pub active: bool,
    pub two_factor_enabled: bool,
    /// Non-null exactly when `two_factor_enabled` is true.
    pub two_factor_secret: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn has_password(&self) -> bool {
        self.password_hash.as_deref().is_some_and(|h| !h.is_empty())
    }
}

/// One active refresh-token grant. Only the SHA-256 of the refresh token is
/// stored; an expired row is inert rather than deleted.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub refresh_token_hash: String,
    pub device_info: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Single-use token backing email verification, password reset and 2FA
/// setup. Once `used` it is permanently inert; live lookups filter both
/// `used` and `expires_at`.
#[derive(Debug, Clone, FromRow)]
pub struct VerificationToken {
    pub id: String,
    pub user_id: Option<String>,
    pub token_hash: String,
    pub token_type: String,
    /// Type-specific secret data; for 2FA setup the pending TOTP secret and
    /// the raw backup code batch.
    pub payload: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationTokenKind {
    EmailVerification,
    PasswordReset,
    TwoFactorSetup,
}

impl VerificationTokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationTokenKind::EmailVerification => "email_verification",
            VerificationTokenKind::PasswordReset => "password_reset",
            VerificationTokenKind::TwoFactorSetup => "2fa_setup",
        }
    }
}

/// At most one row per user; present-and-unexpired means locked. An expired
/// row is inert and removed the next time it is observed.
#[derive(Debug, Clone, FromRow)]
pub struct AccountLock {
    pub id: String,
    pub user_id: String,
    pub locked_until: DateTime<Utc>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TwoFactorBackupCode {
    pub id: String,
    pub user_id: String,
    pub code_hash: String,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit record; never updated or deleted. Rolling counts over
/// this table drive both the login lockout and the 2FA attempt throttle.
#[derive(Debug, Clone, FromRow)]
pub struct LoginAttempt {
    pub id: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}
