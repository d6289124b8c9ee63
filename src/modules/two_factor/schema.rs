use serde::{Deserialize, Serialize};

// =============================================================================
// ENROLLMENT
// =============================================================================

#[derive(Debug, Serialize)]
pub struct Enable2faData {
    pub secret: String,
    /// otpauth:// URI the client renders as a QR code.
    pub otpauth_url: String,
    pub setup_token: String,
    /// Shown exactly once; only hashes are kept after enrollment completes.
    pub backup_codes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEnableRequest {
    #[serde(default)]
    pub setup_token: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct Disable2faRequest {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub code: String,
}

// =============================================================================
// BACKUP CODES
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegenerateBackupRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct RegenerateBackupData {
    pub backup_codes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BackupStatusData {
    pub total_codes: i64,
    pub used_codes: i64,
    pub remaining_codes: i64,
}
