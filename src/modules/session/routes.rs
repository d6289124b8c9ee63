use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::AppState;

use super::controller;

pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", get(controller::list))
        .route("/sessions/{session_id}", delete(controller::revoke))
        .route("/sessions/revoke-all", post(controller::revoke_all))
}
