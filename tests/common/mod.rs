use axum_test::TestServer;
use serde_json::json;
use sqlx::{MySql, Pool};

// Allow dead_code for utilities used by other test files
#[allow(dead_code)]
pub struct TestContext {
    pub server: TestServer,
    pub db: Pool<MySql>,
}

#[allow(dead_code)]
impl TestContext {
    pub async fn new() -> Self {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"));

        let db = sqlx::mysql::MySqlPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .expect("Failed to run migrations");

        let security = accounts_api::config::SecurityConfig::default();
        let jwt_secret = std::env::var("JWT_SECRET")
            .unwrap_or_else(|_| "test-secret-key-for-testing-only".to_string());
        let jwt_service = accounts_api::services::jwt::JwtService::new(&jwt_secret, &security);

        let app = accounts_api::create_app(
            db.clone(),
            jwt_service,
            security,
            "development".to_string(),
        )
        .await;
        let server = TestServer::new(app).expect("Failed to create test server");

        Self { server, db }
    }

    pub async fn cleanup(&self) {
        // Clean up test data after each test
        sqlx::query("DELETE FROM login_attempts")
            .execute(&self.db)
            .await
            .ok();
        sqlx::query("DELETE FROM account_locks")
            .execute(&self.db)
            .await
            .ok();
        sqlx::query("DELETE FROM two_factor_backup_codes")
            .execute(&self.db)
            .await
            .ok();
        sqlx::query("DELETE FROM verification_tokens")
            .execute(&self.db)
            .await
            .ok();
        sqlx::query("DELETE FROM sessions")
            .execute(&self.db)
            .await
            .ok();
        sqlx::query("DELETE FROM users").execute(&self.db).await.ok();
    }
}

// Helper to generate unique test email
#[allow(dead_code)]
pub fn test_email() -> String {
    format!("test_{}@example.com", uuid::Uuid::new_v4())
}

// Helper to generate test password
#[allow(dead_code)]
pub fn test_password() -> &'static str {
    "TestPassword123!"
}

/// Registers a user and completes email verification via the dev token the
/// development environment returns in the register response.
#[allow(dead_code)]
pub async fn register_verified_user(ctx: &TestContext) -> String {
    let email = test_email();

    let response = ctx
        .server
        .post("/auth/register")
        .json(&json!({
            "email": &email,
            "password": test_password(),
            "name": "Test",
            "last_name": "User"
        }))
        .await;

    let body: serde_json::Value = response.json();
    let token = body["_dev_verification_token"]
        .as_str()
        .expect("dev verification token missing")
        .to_string();

    ctx.server
        .post("/auth/verify-email")
        .json(&json!({ "token": token }))
        .await;

    email
}

/// Logs in with the standard test password and returns the response body.
#[allow(dead_code)]
pub async fn login_user(ctx: &TestContext, email: &str) -> serde_json::Value {
    let response = ctx
        .server
        .post("/auth/login")
        .json(&json!({
            "email": email,
            "password": test_password()
        }))
        .await;

    response.json()
}
