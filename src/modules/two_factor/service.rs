use chrono::Utc;
use uuid::Uuid;

use crate::config::{DbPool, SecurityConfig};
use crate::modules::auth::crud::{BackupCodeCrud, VerificationTokenCrud};
use crate::modules::auth::error::AuthError;
use crate::modules::auth::model::{User, VerificationToken, VerificationTokenKind};
use crate::services::{hashing, totp};

/// Enrollment lifecycle: NotEnrolled → PendingVerification → Enrolled. The
/// pending secret and raw backup codes live only in a short-lived setup
/// token payload until the first valid code proves the authenticator works.
pub struct TwoFactorFlow<'a> {
    pool: DbPool,
    security: &'a SecurityConfig,
}

#[derive(Debug)]
pub struct EnrollmentStart {
    pub secret: String,
    pub otpauth_url: String,
    pub setup_token: String,
    pub backup_codes: Vec<String>,
}

#[derive(Debug)]
pub struct BackupCodeStatus {
    pub total: i64,
    pub used: i64,
    pub remaining: i64,
}

impl<'a> TwoFactorFlow<'a> {
    pub fn new(pool: DbPool, security: &'a SecurityConfig) -> Self {
        Self { pool, security }
    }

    pub async fn begin_enroll(&self, user: &User) -> Result<EnrollmentStart, AuthError> {
        if user.two_factor_enabled {
            return Err(AuthError::TwoFactorAlreadyEnabled);
        }

        let (secret, otpauth_url) =
            totp::generate_enrollment(&self.security.totp_issuer, &user.email)
                .map_err(|e| AuthError::Internal(e.to_string()))?;
        let backup_codes = totp::generate_backup_codes(self.security.backup_code_count);
        let setup_token = hashing::random_token(32);

        let now = Utc::now();
        let pending = VerificationToken {
            id: Uuid::new_v4().to_string(),
            user_id: Some(user.id.clone()),
            token_hash: hashing::token_digest(&setup_token),
            token_type: VerificationTokenKind::TwoFactorSetup.as_str().to_string(),
            payload: Some(format!("{}|{}", secret, backup_codes.join(","))),
            expires_at: now + self.security.setup_token_ttl,
            created_at: now,
            used: false,
            used_at: None,
        };
        VerificationTokenCrud::new(self.pool.clone())
            .create(&pending)
            .await?;

        Ok(EnrollmentStart {
            secret,
            otpauth_url,
            setup_token,
            backup_codes,
        })
    }

    /// Activates 2FA once the client proves it can produce a valid code for
    /// the pending secret. The user flip, backup-code insert and setup-token
    /// consumption commit together; consuming first makes a racing duplicate
    /// lose cleanly.
    pub async fn complete_enroll(
        &self,
        user: &User,
        setup_token: &str,
        code: &str,
    ) -> Result<(), AuthError> {
        if user.two_factor_enabled {
            return Err(AuthError::TwoFactorAlreadyEnabled);
        }

        let pending = VerificationTokenCrud::new(self.pool.clone())
            .find_unused_for_user(
                &hashing::token_digest(setup_token.trim()),
                VerificationTokenKind::TwoFactorSetup,
                &user.id,
            )
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if pending.expires_at <= Utc::now() {
            return Err(AuthError::TokenExpired);
        }

        let payload = pending.payload.as_deref().ok_or(AuthError::InvalidToken)?;
        let (secret, codes_csv) = payload.split_once('|').ok_or(AuthError::InvalidToken)?;

        if !totp::verify_code(secret, code.trim()) {
            return Err(AuthError::InvalidCode {
                attempts_remaining: None,
            });
        }

        let mut tx = self.pool.begin().await?;

        let consumed = sqlx::query(
            "UPDATE verification_tokens SET used = TRUE, used_at = ? WHERE id = ? AND used = FALSE",
        )
        .bind(Utc::now())
        .bind(&pending.id)
        .execute(&mut *tx)
        .await?;
        if consumed.rows_affected() != 1 {
            return Err(AuthError::InvalidToken);
        }

        sqlx::query("UPDATE users SET two_factor_enabled = TRUE, two_factor_secret = ? WHERE id = ?")
            .bind(secret)
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;

        for raw_code in codes_csv.split(',').filter(|c| !c.is_empty()) {
            sqlx::query(
                "INSERT INTO two_factor_backup_codes (id, user_id, code_hash, used) VALUES (?, ?, ?, FALSE)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&user.id)
            .bind(hashing::token_digest(&totp::normalize_backup_code(raw_code)))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(user_id = %user.id, "two-factor authentication enabled");

        Ok(())
    }

    /// Turning 2FA off needs both factors again: the current password and a
    /// live code. Clears the secret and deletes every backup code.
    pub async fn disable(&self, user: &User, password: &str, code: &str) -> Result<(), AuthError> {
        if !user.two_factor_enabled {
            return Err(AuthError::TwoFactorNotEnabled);
        }

        let Some(password_hash) = user.password_hash.as_deref().filter(|h| !h.is_empty()) else {
            return Err(AuthError::NoPasswordSet);
        };
        if !hashing::verify_password(password, password_hash) {
            return Err(AuthError::InvalidPassword);
        }

        let secret = user
            .two_factor_secret
            .as_deref()
            .ok_or(AuthError::TwoFactorNotEnabled)?;
        if !totp::verify_code(secret, code.trim()) {
            return Err(AuthError::InvalidCode {
                attempts_remaining: None,
            });
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE users SET two_factor_enabled = FALSE, two_factor_secret = NULL WHERE id = ?",
        )
        .bind(&user.id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM two_factor_backup_codes WHERE user_id = ?")
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, "two-factor authentication disabled");
        Ok(())
    }

    /// Replaces the whole batch: prior codes are deleted and the new ones
    /// inserted in one transaction, so no mixed batch is ever observable.
    pub async fn regenerate_backup_codes(
        &self,
        user: &User,
        code: &str,
    ) -> Result<Vec<String>, AuthError> {
        if !user.two_factor_enabled {
            return Err(AuthError::TwoFactorNotEnabled);
        }
        let secret = user
            .two_factor_secret
            .as_deref()
            .ok_or(AuthError::TwoFactorNotEnabled)?;
        if !totp::verify_code(secret, code.trim()) {
            return Err(AuthError::InvalidCode {
                attempts_remaining: None,
            });
        }

        let backup_codes = totp::generate_backup_codes(self.security.backup_code_count);

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM two_factor_backup_codes WHERE user_id = ?")
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;
        for raw_code in &backup_codes {
            sqlx::query(
                "INSERT INTO two_factor_backup_codes (id, user_id, code_hash, used) VALUES (?, ?, ?, FALSE)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&user.id)
            .bind(hashing::token_digest(&totp::normalize_backup_code(raw_code)))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(backup_codes)
    }

    pub async fn backup_code_status(&self, user: &User) -> Result<BackupCodeStatus, AuthError> {
        if !user.two_factor_enabled {
            return Err(AuthError::TwoFactorNotEnabled);
        }

        let codes = BackupCodeCrud::new(self.pool.clone());
        let total = codes.count_total(&user.id).await?;
        let unused = codes.count_unused(&user.id).await?;

        Ok(BackupCodeStatus {
            total,
            used: total - unused,
            remaining: unused,
        })
    }
}
