use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::modules::auth::crud::SessionCrud;
use crate::modules::auth::error::AuthError;
use crate::modules::auth::extract::AuthUser;
use crate::modules::auth::schema::{Envelope, MessageResponse};
use crate::AppState;

use super::schema::{
    RevokeAllData, RevokeAllResponse, RevokeAllSessionsRequest, SessionInfo, SessionListData,
};

pub async fn list(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Envelope<SessionListData>>, AuthError> {
    let sessions = SessionCrud::new(state.db.clone())
        .list_live(&auth.user.id)
        .await?;

    // Already ordered by recency; the head is the best-effort current session
    let infos = sessions
        .iter()
        .enumerate()
        .map(|(i, session)| SessionInfo::from_session(session, i == 0))
        .collect();

    Ok(Json(Envelope::ok(SessionListData { sessions: infos })))
}

pub async fn revoke(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(session_id): Path<String>,
) -> Result<Json<MessageResponse>, AuthError> {
    let sessions = SessionCrud::new(state.db.clone());

    let session = sessions
        .find_for_user(&session_id, &auth.user.id)
        .await?
        .ok_or(AuthError::SessionNotFound)?;

    if session.revoked {
        return Err(AuthError::AlreadyRevoked);
    }

    sessions.revoke(&session.id).await?;

    Ok(Json(MessageResponse::new("Session revoked successfully")))
}

pub async fn revoke_all(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: Option<Json<RevokeAllSessionsRequest>>,
) -> Result<Json<RevokeAllResponse>, AuthError> {
    let include_current = body.map(|Json(req)| req.include_current).unwrap_or(false);
    let sessions = SessionCrud::new(state.db.clone());

    let (revoked_count, message) = if include_current {
        (
            sessions.revoke_all_for_user(&auth.user.id).await?,
            "All sessions revoked successfully",
        )
    } else {
        match sessions.most_recent_live(&auth.user.id).await? {
            Some(current) => (
                sessions
                    .revoke_all_except(&auth.user.id, &current.id)
                    .await?,
                "All other sessions revoked successfully",
            ),
            None => (
                sessions.revoke_all_for_user(&auth.user.id).await?,
                "All sessions revoked successfully",
            ),
        }
    };

    Ok(Json(RevokeAllResponse {
        success: true,
        message,
        data: RevokeAllData { revoked_count },
    }))
}
