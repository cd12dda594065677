//! Shop session inspection commands.

#![allow(clippy::print_stdout)] // operator-facing command output

use secrecy::SecretString;
use thiserror::Error;

use vestia_api::db::{SessionRepository, create_pool};
use vestia_core::ShopDomain;

#[derive(Debug, Error)]
pub enum SessionCommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid shop domain: {0}")]
    InvalidShop(#[from] vestia_core::ShopDomainError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] vestia_api::db::RepositoryError),
}

async fn pool() -> Result<sqlx::PgPool, SessionCommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| SessionCommandError::MissingEnvVar("DATABASE_URL"))?;

    Ok(create_pool(&database_url).await?)
}

/// List installed shops with their scopes. Tokens are never printed.
pub async fn list() -> Result<(), SessionCommandError> {
    let pool = pool().await?;

    let rows: Vec<(String, String, bool)> =
        sqlx::query_as("SELECT shop, scope, is_online FROM sessions ORDER BY shop")
            .fetch_all(&pool)
            .await?;

    if rows.is_empty() {
        println!("No shops installed.");
        return Ok(());
    }

    println!("{:<40} {:<10} SCOPES", "SHOP", "ONLINE");
    for (shop, scope, is_online) in rows {
        println!("{shop:<40} {is_online:<10} {scope}");
    }
    Ok(())
}

/// Delete one shop's session.
pub async fn delete(shop: &str) -> Result<(), SessionCommandError> {
    let shop = ShopDomain::parse(shop)?;
    let pool = pool().await?;

    let deleted = SessionRepository::new(&pool).delete(&shop).await?;
    if deleted {
        println!("Deleted session for {shop}.");
    } else {
        println!("No session found for {shop}.");
    }
    Ok(())
}
