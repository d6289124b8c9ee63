use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;

/// The three bearer token kinds this service signs. Every consuming endpoint
/// must name the kind it expects; a `temp_2fa` token never authorizes an
/// access-protected resource and an `access` token is never accepted where a
/// 2FA challenge is being completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
    Temp2fa,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::Temp2fa => "temp_2fa",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // user id
    pub email: String,
    pub role: String,
    pub token_type: String, // "access" | "refresh" | "temp_2fa"
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
    #[error("unexpected token type")]
    WrongType,
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    temp_ttl: Duration,
}

impl JwtService {
    pub fn new(secret: &str, config: &SecurityConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: env!("CARGO_PKG_NAME").to_string(),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
            temp_ttl: config.temp_token_ttl,
        }
    }

    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
            TokenKind::Temp2fa => self.temp_ttl,
        }
    }

    pub fn issue(
        &self,
        user_id: &str,
        email: &str,
        role: &str,
        kind: TokenKind,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let exp = now + self.ttl(kind);

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            token_type: kind.as_str().to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Verifies signature, expiry, not-before and issuer.
    pub fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_nbf = true;

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                _ => Err(TokenError::Invalid),
            },
        }
    }

    /// Parses the token and additionally requires the embedded `token_type`
    /// claim to match `expected`. This is the type-confusion guard: callers
    /// must go through this method rather than `parse` when gating an
    /// endpoint.
    pub fn parse_expecting(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.parse(token)?;
        if claims.token_type != expected.as_str() {
            return Err(TokenError::WrongType);
        }
        Ok(claims)
    }

    pub fn access_token_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }
}
