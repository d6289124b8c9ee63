use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RequestResetRequest {
    #[serde(default)]
    pub email: String,
}

/// Identical for existing and unknown emails so the endpoint cannot be used
/// to enumerate accounts. The dev token is the only (development-only)
/// divergence.
#[derive(Debug, Serialize)]
pub struct RequestResetResponse {
    pub success: bool,
    pub message: &'static str,
    #[serde(rename = "_dev_password_reset_token", skip_serializing_if = "Option::is_none")]
    pub dev_reset_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub new_password: String,
}
