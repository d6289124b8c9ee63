use chrono::Utc;
use uuid::Uuid;

use crate::config::{DbPool, SecurityConfig};
use crate::modules::auth::crud::{UserCrud, VerificationTokenCrud};
use crate::modules::auth::error::AuthError;
use crate::modules::auth::model::{User, VerificationToken, VerificationTokenKind};
use crate::modules::auth::service::normalize_email;
use crate::services::hashing;

pub struct PasswordFlow<'a> {
    pool: DbPool,
    security: &'a SecurityConfig,
}

impl<'a> PasswordFlow<'a> {
    pub fn new(pool: DbPool, security: &'a SecurityConfig) -> Self {
        Self { pool, security }
    }

    pub async fn change(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let Some(password_hash) = user.password_hash.as_deref().filter(|h| !h.is_empty()) else {
            return Err(AuthError::NoPasswordSet);
        };

        if !hashing::verify_password(current_password, password_hash) {
            return Err(AuthError::InvalidPassword);
        }

        let new_hash =
            hashing::hash_password(new_password).map_err(|e| AuthError::Internal(e.to_string()))?;
        UserCrud::new(self.pool.clone())
            .update_password(&user.id, &new_hash)
            .await?;

        Ok(())
    }

    /// First-password path for accounts provisioned through an external
    /// identity provider.
    pub async fn set(&self, user: &User, password: &str) -> Result<(), AuthError> {
        if user.has_password() {
            return Err(AuthError::PasswordAlreadySet);
        }

        let hash =
            hashing::hash_password(password).map_err(|e| AuthError::Internal(e.to_string()))?;
        UserCrud::new(self.pool.clone())
            .update_password(&user.id, &hash)
            .await?;

        Ok(())
    }

    /// Returns the raw reset token when one was issued, `None` when the email
    /// is unknown or has no password. Callers must answer identically either
    /// way; prior outstanding reset tokens are invalidated first.
    pub async fn request_reset(&self, email: &str) -> Result<Option<String>, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Ok(None);
        }

        let Some(user) = UserCrud::new(self.pool.clone()).find_by_email(&email).await? else {
            return Ok(None);
        };
        if !user.has_password() {
            return Ok(None);
        }

        let tokens = VerificationTokenCrud::new(self.pool.clone());
        tokens
            .invalidate_for_user(&user.id, VerificationTokenKind::PasswordReset)
            .await?;

        let raw_token = hashing::random_token(32);
        let now = Utc::now();
        tokens
            .create(&VerificationToken {
                id: Uuid::new_v4().to_string(),
                user_id: Some(user.id.clone()),
                token_hash: hashing::token_digest(&raw_token),
                token_type: VerificationTokenKind::PasswordReset.as_str().to_string(),
                payload: None,
                expires_at: now + self.security.reset_token_ttl,
                created_at: now,
                used: false,
                used_at: None,
            })
            .await?;

        Ok(Some(raw_token))
    }

    /// Consumes the reset token, rewrites the credential and revokes every
    /// session in one transaction: a compromised password must not leave old
    /// sessions usable.
    pub async fn reset(&self, raw_token: &str, new_password: &str) -> Result<(), AuthError> {
        let token = VerificationTokenCrud::new(self.pool.clone())
            .find_unused(
                &hashing::token_digest(raw_token.trim()),
                VerificationTokenKind::PasswordReset,
            )
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if token.expires_at <= Utc::now() {
            return Err(AuthError::TokenExpired);
        }

        let user_id = token.user_id.as_deref().ok_or(AuthError::InvalidToken)?;
        let new_hash =
            hashing::hash_password(new_password).map_err(|e| AuthError::Internal(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        let consumed = sqlx::query(
            "UPDATE verification_tokens SET used = TRUE, used_at = ? WHERE id = ? AND used = FALSE",
        )
        .bind(Utc::now())
        .bind(&token.id)
        .execute(&mut *tx)
        .await?;
        if consumed.rows_affected() != 1 {
            return Err(AuthError::InvalidToken);
        }

        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(&new_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE sessions SET revoked = TRUE, revoked_at = ? WHERE user_id = ? AND revoked = FALSE",
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(user_id, "password reset completed, all sessions revoked");

        Ok(())
    }
}
