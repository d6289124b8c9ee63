use axum::{routing::post, Router};
use std::sync::Arc;

use crate::AppState;

use super::controller;

pub fn password_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/password/change", post(controller::change))
        .route("/password/set", post(controller::set))
        .route("/password/reset/request", post(controller::request_reset))
        .route("/password/reset", post(controller::reset))
}
