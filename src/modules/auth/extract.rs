use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use serde_json::json;

use crate::services::jwt::TokenKind;
use crate::AppState;

use super::{crud::UserCrud, error::AuthError, model::User};

/// The authenticated principal, resolved once at the boundary from a Bearer
/// access token and passed into handlers by value. Only `access` tokens are
/// accepted here; a `temp_2fa` token proves password success, not identity.
pub struct AuthUser {
    pub user: User,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::Unauthorized)?;

        let token = header_value
            .strip_prefix("Bearer ")
            .or_else(|| header_value.strip_prefix("bearer "))
            .ok_or(AuthError::Unauthorized)?;

        let claims = state.jwt_service.parse_expecting(token, TokenKind::Access)?;

        let user = UserCrud::new(state.db.clone())
            .find_by_id(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !user.active {
            return Err(AuthError::AccountInactive);
        }

        Ok(AuthUser { user })
    }
}

/// Best-effort client metadata for the audit trail and session device info.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn device_info_json(&self) -> String {
        json!({
            "ip_address": self.ip_address.as_deref().unwrap_or(""),
            "user_agent": self.user_agent.as_deref().unwrap_or(""),
        })
        .to_string()
    }
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;

        let ip_address = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string())
            });

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty());

        Ok(ClientInfo {
            ip_address,
            user_agent,
        })
    }
}
