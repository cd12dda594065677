//! Integration tests for Vestia.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and run migrations
//! docker compose up -d postgres
//! cargo run -p vestia-cli -- migrate
//!
//! # Start the API
//! cargo run -p vestia-api
//!
//! # Run integration tests (ignored by default)
//! cargo test -p vestia-integration-tests -- --ignored
//! ```
//!
//! # Environment
//!
//! - `API_BASE_URL` - where the API is listening (default http://localhost:3000)
//! - `DATABASE_URL` - the database the API is using, for direct assertions
//!
//! # Test Categories
//!
//! - `widget_api` - route contract tests (auth failures, CORS, health)
//! - `webhooks` - webhook processing against the database
//! - `sessions` - session repository round-trips

use secrecy::SecretString;
use sqlx::PgPool;

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn api_base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Connect to the database the API under test is using.
///
/// # Panics
///
/// Panics when `DATABASE_URL` is unset or unreachable - these tests are
/// `#[ignore]`d precisely because they need that environment.
pub async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .expect("DATABASE_URL must be set for integration tests");

    vestia_api::db::create_pool(&url)
        .await
        .expect("Failed to connect to test database")
}

/// A unique shop domain per test run, so tests never collide.
#[must_use]
pub fn unique_shop() -> String {
    format!("test-{}.myshopify.com", uuid::Uuid::new_v4().simple())
}
