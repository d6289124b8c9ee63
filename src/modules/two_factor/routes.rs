use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::AppState;

use super::controller;

pub fn two_factor_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/2fa/enable", post(controller::enable))
        .route("/2fa/verify-enable", post(controller::verify_enable))
        .route("/2fa/disable", post(controller::disable))
        .route("/2fa/backup/regenerate", post(controller::regenerate_backup))
        .route("/2fa/backup/status", get(controller::backup_status))
}
