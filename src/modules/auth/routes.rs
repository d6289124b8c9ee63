use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::AppState;

use super::controller;

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(controller::register))
        .route("/login", post(controller::login))
        .route("/2fa/verify", post(controller::verify_two_factor))
        .route("/2fa/verify-backup", post(controller::verify_backup_code))
        .route("/refresh", post(controller::refresh))
        .route("/logout", post(controller::logout))
        .route("/verify-email", post(controller::verify_email))
        .route("/me", get(controller::me))
}
