use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::config::{DbPool, SecurityConfig};
use crate::modules::auth::model::AccountLock;

/// Brute-force lock state for one user.
#[derive(Debug, Clone, PartialEq)]
pub enum LockState {
    Unlocked,
    Locked {
        until: DateTime<Utc>,
        reason: Option<String>,
    },
}

/// Derives and mutates per-user lock state from the append-only login-attempt
/// trail. Failed attempts are counted over a trailing window equal to the
/// lock duration; hitting the threshold upserts the single lock row for the
/// user. Concurrent failures may upsert the same row twice — last write wins
/// on `locked_until`, which is benign.
pub struct LockoutPolicy {
    pool: DbPool,
    max_attempts: i64,
    lock_duration: Duration,
}

impl LockoutPolicy {
    pub fn new(pool: DbPool, config: &SecurityConfig) -> Self {
        Self {
            pool,
            max_attempts: config.max_login_attempts,
            lock_duration: config.lock_duration,
        }
    }

    /// Called before any credential verification. An expired lock row is
    /// inert; it is removed here on observation rather than by any
    /// background job.
    pub async fn check(&self, user_id: &str) -> Result<LockState, sqlx::Error> {
        let row: Option<AccountLock> =
            sqlx::query_as("SELECT * FROM account_locks WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(lock) if lock.locked_until > Utc::now() => Ok(LockState::Locked {
                until: lock.locked_until,
                reason: lock.reason,
            }),
            Some(_) => {
                sqlx::query("DELETE FROM account_locks WHERE user_id = ?")
                    .bind(user_id)
                    .execute(&self.pool)
                    .await?;
                Ok(LockState::Unlocked)
            }
            None => Ok(LockState::Unlocked),
        }
    }

    /// Evaluates the attempt history after a failure has been recorded and
    /// transitions to `Locked` when the threshold is reached. Returns the
    /// lock expiry when a lock was written.
    pub async fn register_failure(
        &self,
        user_id: &str,
    ) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        let failures = self.recent_failures(user_id).await?;
        if failures < self.max_attempts {
            return Ok(None);
        }

        let locked_until = Utc::now() + self.lock_duration;
        sqlx::query(
            r#"
            INSERT INTO account_locks (id, user_id, locked_until, reason)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE locked_until = VALUES(locked_until), reason = VALUES(reason)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(locked_until)
        .bind("Multiple failed login attempts")
        .execute(&self.pool)
        .await?;

        tracing::warn!(user_id, %locked_until, "account locked after repeated failed logins");
        Ok(Some(locked_until))
    }

    /// Clears the lock row regardless of its expiry state. Idempotent.
    pub async fn clear(&self, user_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM account_locks WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Failed attempts inside the trailing window.
    pub async fn recent_failures(&self, user_id: &str) -> Result<i64, sqlx::Error> {
        let since = Utc::now() - self.lock_duration;
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM login_attempts WHERE user_id = ? AND success = FALSE AND created_at > ?",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
    }
}
