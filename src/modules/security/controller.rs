use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::modules::auth::crud::{LoginAttemptCrud, UserCrud};
use crate::modules::auth::error::AuthError;
use crate::modules::auth::extract::AuthUser;
use crate::modules::auth::schema::Envelope;
use crate::modules::auth::service::normalize_email;
use crate::services::lockout::{LockState, LockoutPolicy};
use crate::AppState;

use super::schema::{
    AccountStatusData, AccountStatusRequest, LoginAttemptInfo, LoginHistoryData, LoginHistoryQuery,
};

const HISTORY_DEFAULT_LIMIT: i64 = 20;
const HISTORY_MAX_LIMIT: i64 = 100;

/// Lock state for an email. Unknown emails report as unlocked with a zero
/// count, indistinguishable from a clean account.
pub async fn account_status(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AccountStatusRequest>,
) -> Result<Json<Envelope<AccountStatusData>>, AuthError> {
    let email = normalize_email(&req.email);
    if email.is_empty() {
        return Err(AuthError::validation("Email is required"));
    }

    let Some(user) = UserCrud::new(state.db.clone()).find_by_email(&email).await? else {
        return Ok(Json(Envelope::ok(AccountStatusData {
            is_locked: false,
            locked_until: None,
            failed_attempts: 0,
            reason: None,
        })));
    };

    let lockout = LockoutPolicy::new(state.db.clone(), &state.security);
    let failed_attempts = lockout.recent_failures(&user.id).await?;

    let data = match lockout.check(&user.id).await? {
        LockState::Locked { until, reason } => AccountStatusData {
            is_locked: true,
            locked_until: Some(until),
            failed_attempts,
            reason,
        },
        LockState::Unlocked => AccountStatusData {
            is_locked: false,
            locked_until: None,
            failed_attempts,
            reason: None,
        },
    };

    Ok(Json(Envelope::ok(data)))
}

pub async fn login_history(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<LoginHistoryQuery>,
) -> Result<Json<Envelope<LoginHistoryData>>, AuthError> {
    let limit = query
        .limit
        .filter(|l| *l > 0 && *l <= HISTORY_MAX_LIMIT)
        .unwrap_or(HISTORY_DEFAULT_LIMIT);
    let offset = query.offset.filter(|o| *o >= 0).unwrap_or(0);

    let attempts = LoginAttemptCrud::new(state.db.clone());
    let total = attempts.count_for_user(&auth.user.id).await?;
    let page = attempts.history(&auth.user.id, limit, offset).await?;

    Ok(Json(Envelope::ok(LoginHistoryData {
        total,
        limit,
        offset,
        attempts: page.iter().map(LoginAttemptInfo::from).collect(),
    })))
}
