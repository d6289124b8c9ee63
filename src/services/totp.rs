use rand::Rng;
use totp_rs::{Algorithm, Secret, TOTP};

// Standard TOTP parameters: SHA-1, 6 digits, 30-second step, one step of
// clock-skew tolerance either side.
const TOTP_DIGITS: usize = 6;
const TOTP_SKEW: u8 = 1;
const TOTP_STEP: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum TotpError {
    #[error("invalid TOTP secret")]
    InvalidSecret,
}

fn totp_for(secret_bytes: Vec<u8>, issuer: &str, account: &str) -> Result<TOTP, TotpError> {
    TOTP::new(
        Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW,
        TOTP_STEP,
        secret_bytes,
        Some(issuer.to_string()),
        account.to_string(),
    )
    .map_err(|_| TotpError::InvalidSecret)
}

fn totp_from_base32(secret_base32: &str, issuer: &str, account: &str) -> Result<TOTP, TotpError> {
    let secret_bytes = Secret::Encoded(secret_base32.to_string())
        .to_bytes()
        .map_err(|_| TotpError::InvalidSecret)?;
    totp_for(secret_bytes, issuer, account)
}

/// Generates a fresh shared secret and returns it base32-encoded together
/// with the otpauth:// URI the client renders as a QR code.
pub fn generate_enrollment(issuer: &str, account: &str) -> Result<(String, String), TotpError> {
    let secret_bytes = Secret::generate_secret()
        .to_bytes()
        .map_err(|_| TotpError::InvalidSecret)?;
    let totp = totp_for(secret_bytes, issuer, account)?;
    Ok((totp.get_secret_base32(), totp.get_url()))
}

/// Validates a client-submitted code against the shared secret at the current
/// time step. A malformed secret or clock failure counts as a mismatch.
pub fn verify_code(secret_base32: &str, code: &str) -> bool {
    let Ok(totp) = totp_from_base32(secret_base32, "verify", "verify") else {
        return false;
    };
    totp.check_current(code).unwrap_or(false)
}

/// One batch of single-use recovery codes, rendered `XXXX-XXXX` with
/// uppercase hex groups.
pub fn generate_backup_codes(count: usize) -> Vec<String> {
    (0..count).map(|_| generate_backup_code()).collect()
}

fn generate_backup_code() -> String {
    let bytes: [u8; 4] = rand::rng().random();
    let chars = hex::encode_upper(bytes);
    format!("{}-{}", &chars[..4], &chars[4..])
}

/// Canonical form matched against stored hashes: uppercase with the dash and
/// any stray whitespace stripped, so users can paste codes however their
/// manager formatted them.
pub fn normalize_backup_code(raw: &str) -> String {
    raw.trim()
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}
