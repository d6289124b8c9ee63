use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::DbPool;

use super::model::{LoginAttempt, Session, User, VerificationToken, VerificationTokenKind};

// =============================================================================
// USERS
// =============================================================================

pub struct UserCrud {
    pool: DbPool,
}

impl UserCrud {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user: &User) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, email, email_verified, password_hash, name, last_name, role, active,
                 two_factor_enabled, two_factor_secret, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(user.email_verified)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.last_name)
        .bind(&user.role)
        .bind(user.active)
        .bind(user.two_factor_enabled)
        .bind(&user.two_factor_secret)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    pub async fn set_email_verified(&self, user_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET email_verified = TRUE WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_password(&self, user_id: &str, password_hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn touch_last_login(&self, user_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// =============================================================================
// SESSIONS
// =============================================================================

pub struct SessionCrud {
    pool: DbPool,
}

impl SessionCrud {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, session: &Session) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO sessions
                (id, user_id, refresh_token_hash, device_info, expires_at,
                 created_at, last_activity_at, revoked)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.refresh_token_hash)
        .bind(&session.device_info)
        .bind(session.expires_at)
        .bind(session.created_at)
        .bind(session.last_activity_at)
        .bind(session.revoked)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_live_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE refresh_token_hash = ? AND revoked = FALSE",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_for_user(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = ? AND user_id = ?")
            .bind(session_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn touch_activity(&self, session_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE sessions SET last_activity_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Flips `revoked` exactly once; a second call affects zero rows.
    pub async fn revoke(&self, session_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked = TRUE, revoked_at = ? WHERE id = ? AND revoked = FALSE",
        )
        .bind(Utc::now())
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn revoke_all_for_user(&self, user_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked = TRUE, revoked_at = ? WHERE user_id = ? AND revoked = FALSE",
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn revoke_all_except(
        &self,
        user_id: &str,
        keep_session_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET revoked = TRUE, revoked_at = ?
            WHERE user_id = ? AND revoked = FALSE AND id != ?
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .bind(keep_session_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Live sessions, most recently active first. Expired rows are filtered
    /// here rather than deleted.
    pub async fn list_live(&self, user_id: &str) -> Result<Vec<Session>, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE user_id = ? AND revoked = FALSE AND expires_at > ?
            ORDER BY last_activity_at DESC
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await
    }

    /// Best-effort "current" session: the most recently active live one.
    /// Ties in the same instant are broken by query ordering; never use this
    /// for security decisions.
    pub async fn most_recent_live(&self, user_id: &str) -> Result<Option<Session>, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE user_id = ? AND revoked = FALSE AND expires_at > ?
            ORDER BY last_activity_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
    }
}

// =============================================================================
// VERIFICATION TOKENS
// =============================================================================

pub struct VerificationTokenCrud {
    pool: DbPool,
}

impl VerificationTokenCrud {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, token: &VerificationToken) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO verification_tokens
                (id, user_id, token_hash, token_type, payload, expires_at, created_at, used)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&token.id)
        .bind(&token.user_id)
        .bind(&token.token_hash)
        .bind(&token.token_type)
        .bind(&token.payload)
        .bind(token.expires_at)
        .bind(token.created_at)
        .bind(token.used)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Unused token of the given kind; expiry is checked by the caller so it
    /// can surface TOKEN_EXPIRED distinctly from INVALID_TOKEN.
    pub async fn find_unused(
        &self,
        token_hash: &str,
        kind: VerificationTokenKind,
    ) -> Result<Option<VerificationToken>, sqlx::Error> {
        sqlx::query_as::<_, VerificationToken>(
            "SELECT * FROM verification_tokens WHERE token_hash = ? AND token_type = ? AND used = FALSE",
        )
        .bind(token_hash)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn find_unused_for_user(
        &self,
        token_hash: &str,
        kind: VerificationTokenKind,
        user_id: &str,
    ) -> Result<Option<VerificationToken>, sqlx::Error> {
        sqlx::query_as::<_, VerificationToken>(
            r#"
            SELECT * FROM verification_tokens
            WHERE token_hash = ? AND token_type = ? AND used = FALSE AND user_id = ?
            "#,
        )
        .bind(token_hash)
        .bind(kind.as_str())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Compare-and-set: marks the token used only if it still is not, so two
    /// racing redemptions resolve to exactly one winner.
    pub async fn consume(&self, token_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE verification_tokens SET used = TRUE, used_at = ? WHERE id = ? AND used = FALSE",
        )
        .bind(Utc::now())
        .bind(token_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Invalidates every outstanding token of one kind for a user, e.g. prior
    /// reset links once a new one is requested.
    pub async fn invalidate_for_user(
        &self,
        user_id: &str,
        kind: VerificationTokenKind,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE verification_tokens SET used = TRUE, used_at = ?
            WHERE user_id = ? AND token_type = ? AND used = FALSE
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// TWO-FACTOR BACKUP CODES
// =============================================================================

pub struct BackupCodeCrud {
    pool: DbPool,
}

impl BackupCodeCrud {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Redeems one code with compare-and-set semantics: the update that marks
    /// it used is conditioned on `used = FALSE`, so N concurrent redemptions
    /// of the same code produce exactly one success.
    pub async fn consume(&self, user_id: &str, code_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE two_factor_backup_codes SET used = TRUE, used_at = ?
            WHERE user_id = ? AND code_hash = ? AND used = FALSE
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .bind(code_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn count_total(&self, user_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM two_factor_backup_codes WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn count_unused(&self, user_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM two_factor_backup_codes WHERE user_id = ? AND used = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }
}

// =============================================================================
// LOGIN ATTEMPTS (append-only)
// =============================================================================

pub struct LoginAttemptCrud {
    pool: DbPool,
}

impl LoginAttemptCrud {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        user_id: Option<&str>,
        email: Option<&str>,
        success: bool,
        failure_reason: Option<&str>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO login_attempts
                (id, user_id, email, success, failure_reason, ip_address, user_agent, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(email)
        .bind(success)
        .bind(failure_reason)
        .bind(ip_address)
        .bind(user_agent)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Rolling failure count for one specific reason, e.g. the 2FA throttle
    /// counting `2fa_failed` inside its window.
    pub async fn count_failures_with_reason_since(
        &self,
        user_id: &str,
        reason: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM login_attempts
            WHERE user_id = ? AND success = FALSE AND failure_reason = ? AND created_at > ?
            "#,
        )
        .bind(user_id)
        .bind(reason)
        .bind(since)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn count_for_user(&self, user_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM login_attempts WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn history(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LoginAttempt>, sqlx::Error> {
        sqlx::query_as::<_, LoginAttempt>(
            r#"
            SELECT * FROM login_attempts
            WHERE user_id = ?
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }
}
