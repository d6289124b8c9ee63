use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::modules::auth::model::LoginAttempt;

#[derive(Debug, Deserialize)]
pub struct AccountStatusRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AccountStatusData {
    pub is_locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
    pub failed_attempts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginHistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LoginAttemptInfo {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&LoginAttempt> for LoginAttemptInfo {
    fn from(attempt: &LoginAttempt) -> Self {
        Self {
            id: attempt.id.clone(),
            success: attempt.success,
            failure_reason: attempt.failure_reason.clone(),
            ip_address: attempt.ip_address.clone(),
            user_agent: attempt.user_agent.clone(),
            created_at: attempt.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginHistoryData {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub attempts: Vec<LoginAttemptInfo>,
}
