//! Database operations for the Vestia `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `sessions` - per-shop OAuth session records, keyed by shop domain
//! - `user_images` - widget users' try-on photos, unique on (user, kind)
//! - `orders` - order records mirrored from the orders-create webhook
//!
//! # Migrations
//!
//! Migrations live in `crates/api/migrations/` and are run explicitly via:
//! ```bash
//! cargo run -p vestia-cli -- migrate
//! ```
//! They are never run automatically on server startup.

pub mod orders;
pub mod sessions;
pub mod user_images;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use orders::{NewOrderRecord, OrderRecord, OrderRepository};
pub use sessions::{Session, SessionRepository};
pub use user_images::{NewUserImage, UserImage, UserImageRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., empty access token).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// True when the error looks like the database is unreachable rather
    /// than a query-level failure.
    ///
    /// Used by best-effort reads that degrade to empty results instead of
    /// failing the request (see the images routes). Deliberately narrower
    /// than matching on error message text.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::Database(sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
        )
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
