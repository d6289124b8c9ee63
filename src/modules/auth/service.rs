use chrono::Utc;
use uuid::Uuid;

use crate::config::{DbPool, SecurityConfig};
use crate::services::hashing;
use crate::services::jwt::{JwtService, TokenKind};
use crate::services::lockout::{LockState, LockoutPolicy};
use crate::services::totp;

use super::crud::{BackupCodeCrud, LoginAttemptCrud, SessionCrud, UserCrud, VerificationTokenCrud};
use super::error::AuthError;
use super::extract::ClientInfo;
use super::model::{Session, User, VerificationToken, VerificationTokenKind};

// Audit-trail failure reasons. These feed the rolling counts behind the
// lockout and 2FA throttles, so the strings are part of the data contract.
pub const REASON_USER_NOT_FOUND: &str = "user_not_found";
pub const REASON_NO_PASSWORD: &str = "no_password_set";
pub const REASON_INVALID_PASSWORD: &str = "invalid_password";
pub const REASON_EMAIL_NOT_VERIFIED: &str = "email_not_verified";
pub const REASON_ACCOUNT_INACTIVE: &str = "account_inactive";
pub const REASON_PENDING_2FA: &str = "pending_2fa";
pub const REASON_2FA_FAILED: &str = "2fa_failed";
pub const REASON_BACKUP_INVALID: &str = "backup_code_invalid";

const ALLOWED_ROLES: [&str; 3] = ["support", "admin", "dev"];
const DEFAULT_ROLE: &str = "support";

#[derive(Debug)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated { tokens: IssuedTokens, user: User },
    Requires2fa { temp_token: String },
}

/// Composes credential verification, lockout, the 2FA challenge and the
/// session store into the login / refresh / logout protocols, and owns the
/// audit trail they produce.
pub struct AuthFlow<'a> {
    pool: DbPool,
    jwt: &'a JwtService,
    security: &'a SecurityConfig,
}

impl<'a> AuthFlow<'a> {
    pub fn new(pool: DbPool, jwt: &'a JwtService, security: &'a SecurityConfig) -> Self {
        Self {
            pool,
            jwt,
            security,
        }
    }

    fn lockout(&self) -> LockoutPolicy {
        LockoutPolicy::new(self.pool.clone(), self.security)
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Creates the user plus an email-verification token. Returns the raw
    /// verification token so the (out-of-scope) mailer can deliver it; only
    /// its digest is persisted.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        last_name: &str,
        role: Option<&str>,
    ) -> Result<(User, String), AuthError> {
        let email = normalize_email(email);

        let role = match role.filter(|r| !r.is_empty()) {
            None => DEFAULT_ROLE,
            Some(r) if ALLOWED_ROLES.contains(&r) => r,
            Some(_) => {
                return Err(AuthError::validation(
                    "Invalid role. Must be: support, admin, or dev",
                ))
            }
        };

        let users = UserCrud::new(self.pool.clone());
        if users.email_exists(&email).await? {
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash =
            hashing::hash_password(password).map_err(|e| AuthError::Internal(e.to_string()))?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            email_verified: false,
            password_hash: Some(password_hash),
            name: name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            role: role.to_string(),
            active: true,
            two_factor_enabled: false,
            two_factor_secret: None,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };

        if let Err(e) = users.create(&user).await {
            // Two registrations racing on the same email: the unique key wins
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return Err(AuthError::EmailAlreadyExists);
                }
            }
            return Err(e.into());
        }

        let raw_token = hashing::random_token(32);
        let verification = VerificationToken {
            id: Uuid::new_v4().to_string(),
            user_id: Some(user.id.clone()),
            token_hash: hashing::token_digest(&raw_token),
            token_type: VerificationTokenKind::EmailVerification.as_str().to_string(),
            payload: None,
            expires_at: now + self.security.email_token_ttl,
            created_at: now,
            used: false,
            used_at: None,
        };
        VerificationTokenCrud::new(self.pool.clone())
            .create(&verification)
            .await?;

        Ok((user, raw_token))
    }

    // -------------------------------------------------------------------------
    // Login
    // -------------------------------------------------------------------------

    /// Canonical login ordering: lookup → lockout → password-presence →
    /// password verify → email-verified → active → clear lock → 2FA gate or
    /// session mint. Unknown email and wrong password produce the same error.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<LoginOutcome, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::validation("Email and password are required"));
        }

        let users = UserCrud::new(self.pool.clone());
        let attempts = LoginAttemptCrud::new(self.pool.clone());

        let Some(user) = users.find_by_email(&email).await? else {
            self.record_attempt(&attempts, None, &email, false, Some(REASON_USER_NOT_FOUND), client)
                .await?;
            return Err(AuthError::InvalidCredentials);
        };

        // Locked accounts are rejected before any hashing work; the requester
        // already supplied a matching email, so revealing the expiry is fine.
        if let LockState::Locked { until, .. } = self.lockout().check(&user.id).await? {
            return Err(AuthError::AccountLocked {
                locked_until: until,
            });
        }

        let Some(password_hash) = user.password_hash.as_deref().filter(|h| !h.is_empty()) else {
            self.record_attempt(&attempts, Some(&user.id), &email, false, Some(REASON_NO_PASSWORD), client)
                .await?;
            return Err(AuthError::InvalidCredentials);
        };

        if !hashing::verify_password(password, password_hash) {
            self.record_attempt(&attempts, Some(&user.id), &email, false, Some(REASON_INVALID_PASSWORD), client)
                .await?;

            if let Some(locked_until) = self.lockout().register_failure(&user.id).await? {
                return Err(AuthError::AccountLocked { locked_until });
            }
            return Err(AuthError::InvalidCredentials);
        }

        if !user.email_verified {
            self.record_attempt(&attempts, Some(&user.id), &email, false, Some(REASON_EMAIL_NOT_VERIFIED), client)
                .await?;
            return Err(AuthError::EmailNotVerified);
        }

        if !user.active {
            self.record_attempt(&attempts, Some(&user.id), &email, false, Some(REASON_ACCOUNT_INACTIVE), client)
                .await?;
            return Err(AuthError::AccountInactive);
        }

        self.lockout().clear(&user.id).await?;

        if user.two_factor_enabled {
            let temp_token =
                self.jwt
                    .issue(&user.id, &user.email, &user.role, TokenKind::Temp2fa)?;
            self.record_attempt(&attempts, Some(&user.id), &email, true, Some(REASON_PENDING_2FA), client)
                .await?;
            return Ok(LoginOutcome::Requires2fa { temp_token });
        }

        let tokens = self.finish_login(&user, client).await?;
        Ok(LoginOutcome::Authenticated { tokens, user })
    }

    // -------------------------------------------------------------------------
    // 2FA login challenge
    // -------------------------------------------------------------------------

    pub async fn verify_two_factor_code(
        &self,
        temp_token: &str,
        code: &str,
        client: &ClientInfo,
    ) -> Result<(IssuedTokens, User), AuthError> {
        let user = self.challenge_user(temp_token).await?;
        let attempts = LoginAttemptCrud::new(self.pool.clone());

        let failures = self.recent_challenge_failures(&attempts, &user.id).await?;
        if failures >= self.security.max_two_factor_attempts {
            return Err(AuthError::TooManyAttempts);
        }

        let secret = user
            .two_factor_secret
            .as_deref()
            .ok_or(AuthError::TwoFactorNotEnabled)?;

        if !totp::verify_code(secret, code.trim()) {
            self.record_attempt(&attempts, Some(&user.id), &user.email, false, Some(REASON_2FA_FAILED), client)
                .await?;
            let remaining = (self.security.max_two_factor_attempts - failures - 1).max(0);
            return Err(AuthError::InvalidCode {
                attempts_remaining: Some(remaining),
            });
        }

        self.lockout().clear(&user.id).await?;
        let tokens = self.finish_login(&user, client).await?;
        Ok((tokens, user))
    }

    /// Backup-code fallback for the same challenge. Redemption is
    /// compare-and-set: of N concurrent attempts on one code, exactly one
    /// proceeds. The success message always notes the code is spent; at or
    /// below the warning threshold it also urges regeneration.
    pub async fn verify_backup_code(
        &self,
        temp_token: &str,
        backup_code: &str,
        client: &ClientInfo,
    ) -> Result<(IssuedTokens, User, String), AuthError> {
        let user = self.challenge_user(temp_token).await?;
        let attempts = LoginAttemptCrud::new(self.pool.clone());

        let normalized = totp::normalize_backup_code(backup_code);
        if normalized.is_empty() {
            return Err(AuthError::validation("Backup code is required"));
        }

        let backup_codes = BackupCodeCrud::new(self.pool.clone());
        let consumed = backup_codes
            .consume(&user.id, &hashing::token_digest(&normalized))
            .await?;
        if !consumed {
            self.record_attempt(&attempts, Some(&user.id), &user.email, false, Some(REASON_BACKUP_INVALID), client)
                .await?;
            return Err(AuthError::InvalidBackupCode);
        }

        self.lockout().clear(&user.id).await?;
        let tokens = self.finish_login(&user, client).await?;

        let remaining = backup_codes.count_unused(&user.id).await?;
        let mut warning = String::from("This backup code has been used and cannot be reused");
        if remaining <= self.security.backup_code_warning_threshold {
            warning = format!(
                "{warning}. Warning: You only have {remaining} backup codes remaining. Please regenerate them soon."
            );
        }

        Ok((tokens, user, warning))
    }

    /// Resolves the user behind a `temp_2fa` token. The type check is what
    /// keeps an access or refresh token from completing someone's challenge.
    async fn challenge_user(&self, temp_token: &str) -> Result<User, AuthError> {
        let claims = self
            .jwt
            .parse_expecting(temp_token.trim(), TokenKind::Temp2fa)?;

        let user = UserCrud::new(self.pool.clone())
            .find_by_id(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !user.two_factor_enabled || user.two_factor_secret.is_none() {
            return Err(AuthError::TwoFactorNotEnabled);
        }

        Ok(user)
    }

    async fn recent_challenge_failures(
        &self,
        attempts: &LoginAttemptCrud,
        user_id: &str,
    ) -> Result<i64, AuthError> {
        let since = Utc::now() - self.security.two_factor_attempt_window;
        Ok(attempts
            .count_failures_with_reason_since(user_id, REASON_2FA_FAILED, since)
            .await?)
    }

    // -------------------------------------------------------------------------
    // Sessions
    // -------------------------------------------------------------------------

    /// Mints the access/refresh pair, stores the session keyed by the
    /// refresh-token digest, stamps `last_login_at` and records the success
    /// attempt.
    async fn finish_login(
        &self,
        user: &User,
        client: &ClientInfo,
    ) -> Result<IssuedTokens, AuthError> {
        let tokens = self.create_session(user, client).await?;

        UserCrud::new(self.pool.clone())
            .touch_last_login(&user.id)
            .await?;

        self.record_attempt(
            &LoginAttemptCrud::new(self.pool.clone()),
            Some(&user.id),
            &user.email,
            true,
            None,
            client,
        )
        .await?;

        Ok(tokens)
    }

    async fn create_session(
        &self,
        user: &User,
        client: &ClientInfo,
    ) -> Result<IssuedTokens, AuthError> {
        let access_token = self
            .jwt
            .issue(&user.id, &user.email, &user.role, TokenKind::Access)?;
        let refresh_token = self
            .jwt
            .issue(&user.id, &user.email, &user.role, TokenKind::Refresh)?;

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            refresh_token_hash: hashing::token_digest(&refresh_token),
            device_info: Some(client.device_info_json()),
            expires_at: now + self.security.refresh_token_ttl,
            created_at: now,
            last_activity_at: now,
            revoked: false,
            revoked_at: None,
        };
        SessionCrud::new(self.pool.clone()).create(&session).await?;

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            expires_in: self.jwt.access_token_ttl_secs(),
        })
    }

    /// Issues a fresh access token against a live refresh grant. Both the
    /// token claims and the session row must still be live — revocation wins
    /// over cryptographic validity. The refresh token itself is not rotated.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(String, i64), AuthError> {
        let claims = self.jwt.parse_expecting(refresh_token, TokenKind::Refresh)?;

        let sessions = SessionCrud::new(self.pool.clone());
        let session = sessions
            .find_live_by_token_hash(&hashing::token_digest(refresh_token))
            .await?
            .ok_or(AuthError::SessionInvalid)?;

        if session.expires_at <= Utc::now() {
            return Err(AuthError::SessionExpired);
        }

        let user = UserCrud::new(self.pool.clone())
            .find_by_id(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !user.active {
            return Err(AuthError::AccountInactive);
        }

        let access_token = self
            .jwt
            .issue(&user.id, &user.email, &user.role, TokenKind::Access)?;
        sessions.touch_activity(&session.id).await?;

        Ok((access_token, self.jwt.access_token_ttl_secs()))
    }

    /// Revokes the session behind the refresh token. Reports success even for
    /// unknown tokens so the endpoint cannot be used to probe session state.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let sessions = SessionCrud::new(self.pool.clone());
        if let Some(session) = sessions
            .find_live_by_token_hash(&hashing::token_digest(refresh_token))
            .await?
        {
            sessions.revoke(&session.id).await?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Email verification
    // -------------------------------------------------------------------------

    pub async fn verify_email(&self, raw_token: &str) -> Result<(), AuthError> {
        let tokens = VerificationTokenCrud::new(self.pool.clone());
        let token = tokens
            .find_unused(
                &hashing::token_digest(raw_token.trim()),
                VerificationTokenKind::EmailVerification,
            )
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if token.expires_at <= Utc::now() {
            return Err(AuthError::TokenExpired);
        }

        let user_id = token.user_id.as_deref().ok_or(AuthError::InvalidToken)?;
        let users = UserCrud::new(self.pool.clone());
        let user = users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if user.email_verified {
            return Err(AuthError::AlreadyVerified);
        }

        // Consume first; a racing duplicate sees zero rows and stops here
        if !tokens.consume(&token.id).await? {
            return Err(AuthError::InvalidToken);
        }
        users.set_email_verified(&user.id).await?;

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Audit trail
    // -------------------------------------------------------------------------

    async fn record_attempt(
        &self,
        attempts: &LoginAttemptCrud,
        user_id: Option<&str>,
        email: &str,
        success: bool,
        failure_reason: Option<&str>,
        client: &ClientInfo,
    ) -> Result<(), AuthError> {
        attempts
            .record(
                user_id,
                Some(email),
                success,
                failure_reason,
                client.ip_address.as_deref(),
                client.user_agent.as_deref(),
            )
            .await?;
        Ok(())
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
