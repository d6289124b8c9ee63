use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::Rng;
use sha2::{Digest, Sha256};

// m=64MB, t=2 iterations, p=1 parallelism
// Tuned so a single verification costs tens of milliseconds
fn get_argon2() -> Argon2<'static> {
    let params = Params::new(65536, 2, 1, None).unwrap();
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = get_argon2();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Recomputes the derived key with the salt and parameters embedded in the
/// encoded hash and compares in constant time. A malformed hash string, or
/// any internal error, verifies as `false` rather than surfacing detail.
pub fn verify_password(password: &str, encoded_hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(encoded_hash) else {
        return false;
    };
    get_argon2()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// SHA-256 hex digest used for refresh tokens, verification tokens and
/// backup codes. Raw token material is never persisted.
pub fn token_digest(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cryptographically random opaque token, hex-encoded (`len` bytes of entropy).
pub fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}
