use chrono::Duration;

/// Security policy knobs for the auth engine.
///
/// Constructed once at startup and threaded into the services that need it,
/// so tests can inject short windows and deterministic values instead of
/// relying on process-wide state.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub temp_token_ttl: Duration,

    /// Failed password attempts tolerated inside `lock_duration` before the
    /// account is locked. The counting window equals the lock duration.
    pub max_login_attempts: i64,
    pub lock_duration: Duration,

    pub max_two_factor_attempts: i64,
    pub two_factor_attempt_window: Duration,

    pub backup_code_count: usize,
    /// Remaining-codes count at or below which redemption responses carry a
    /// regenerate-soon warning.
    pub backup_code_warning_threshold: i64,

    pub setup_token_ttl: Duration,
    pub email_token_ttl: Duration,
    pub reset_token_ttl: Duration,

    pub totp_issuer: String,
    pub min_password_len: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(7),
            temp_token_ttl: Duration::minutes(5),
            max_login_attempts: 5,
            lock_duration: Duration::minutes(15),
            max_two_factor_attempts: 3,
            two_factor_attempt_window: Duration::minutes(5),
            backup_code_count: 10,
            backup_code_warning_threshold: 3,
            setup_token_ttl: Duration::minutes(10),
            email_token_ttl: Duration::hours(24),
            reset_token_ttl: Duration::hours(1),
            totp_issuer: "RedOrange".to_string(),
            min_password_len: 8,
        }
    }
}
