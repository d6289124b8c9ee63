use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::modules::auth::model::Session;

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub device_info: Value,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Best-effort marker for the most recently active session; a UI hint,
    /// not a request-affinity guarantee.
    pub current: bool,
}

impl SessionInfo {
    pub fn from_session(session: &Session, current: bool) -> Self {
        let device_info = session
            .device_info
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or(Value::Null);

        Self {
            id: session.id.clone(),
            device_info,
            created_at: session.created_at,
            last_activity_at: session.last_activity_at,
            expires_at: session.expires_at,
            current,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionListData {
    pub sessions: Vec<SessionInfo>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RevokeAllSessionsRequest {
    #[serde(default)]
    pub include_current: bool,
}

#[derive(Debug, Serialize)]
pub struct RevokeAllData {
    pub revoked_count: u64,
}

#[derive(Debug, Serialize)]
pub struct RevokeAllResponse {
    pub success: bool,
    pub message: &'static str,
    pub data: RevokeAllData,
}
