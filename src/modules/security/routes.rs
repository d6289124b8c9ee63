use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::AppState;

use super::controller;

pub fn security_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/security/status", post(controller::account_status))
        .route("/security/login-history", get(controller::login_history))
}
