pub mod config;
pub mod modules;
pub mod services;

use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use config::{DbPool, SecurityConfig};
use modules::auth::auth_routes;
use modules::password::password_routes;
use modules::security::security_routes;
use modules::session::session_routes;
use modules::two_factor::two_factor_routes;
use services::jwt::JwtService;
use services::rate_limit::{create_rate_limiter, RateLimitLayer};
use services::security::security_headers;

pub struct AppState {
    pub db: DbPool,
    pub jwt_service: JwtService,
    pub security: SecurityConfig,
    pub environment: String,
}

impl AppState {
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

pub async fn create_app(
    db: DbPool,
    jwt_service: JwtService,
    security: SecurityConfig,
    environment: String,
) -> Router {
    let state = Arc::new(AppState {
        db,
        jwt_service,
        security,
        environment,
    });

    // Per-client rate limit: burst of 30, then 60 per minute. The real
    // brute-force defense lives in LockoutPolicy; this only caps raw volume.
    let rate_limiter = create_rate_limiter(60, 30);

    let auth = auth_routes()
        .merge(two_factor_routes())
        .merge(password_routes())
        .merge(session_routes())
        .merge(security_routes());

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/auth", auth)
        .layer(middleware::from_fn(security_headers))
        .layer(RequestBodyLimitLayer::new(1024 * 100)) // 100KB max body
        .layer(RateLimitLayer::new(rate_limiter))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> &'static str {
    "Accounts API"
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
