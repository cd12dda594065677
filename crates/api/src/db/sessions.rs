//! Per-shop OAuth session repository.
//!
//! The session is the stored credential set created on the OAuth callback,
//! read by every authenticated route, and deleted by the app-uninstalled
//! webhook. The shop domain is the unique key; installs for the same shop
//! are last-writer-wins (install flows for one shop do not race in
//! practice).

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

use vestia_core::ShopDomain;

use super::RepositoryError;

// =============================================================================
// Types
// =============================================================================

/// A shop's OAuth session.
///
/// Implements `Debug` manually to redact both tokens.
#[derive(Clone)]
pub struct Session {
    /// Shop domain, the unique key.
    pub shop: ShopDomain,
    /// Admin API access token (HIGH PRIVILEGE - redacted in debug output).
    pub access_token: SecretString,
    /// Storefront API token for customer-facing queries, when one was minted.
    pub storefront_token: Option<SecretString>,
    /// Granted OAuth scopes, comma-separated.
    pub scope: String,
    /// Whether this is an online (per-user) token.
    pub is_online: bool,
    /// Expiry for online tokens; offline tokens have none.
    pub expires_at: Option<DateTime<Utc>>,
    /// The shop's custom domain, when it has one (display only, never a key).
    pub custom_domain: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .field(
                "storefront_token",
                &self.storefront_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("scope", &self.scope)
            .field("is_online", &self.is_online)
            .field("expires_at", &self.expires_at)
            .field("custom_domain", &self.custom_domain)
            .finish()
    }
}

/// Internal row type for `PostgreSQL` queries.
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    shop: String,
    access_token: String,
    storefront_token: Option<String>,
    scope: String,
    is_online: bool,
    expires_at: Option<DateTime<Utc>>,
    custom_domain: Option<String>,
}

impl TryFrom<SessionRow> for Session {
    type Error = RepositoryError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let shop = ShopDomain::parse(&row.shop)
            .map_err(|e| RepositoryError::DataCorruption(format!("bad shop domain: {e}")))?;

        Ok(Self {
            shop,
            access_token: SecretString::from(row.access_token),
            storefront_token: row.storefront_token.map(SecretString::from),
            scope: row.scope,
            is_online: row.is_online,
            expires_at: row.expires_at,
            custom_domain: row.custom_domain,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for session database operations.
pub struct SessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new session repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Save or update a shop's session.
    ///
    /// Uses upsert so re-installs replace the previous credentials.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the access token is empty and
    /// `RepositoryError::Database` if the query fails.
    pub async fn store(&self, session: &Session) -> Result<(), RepositoryError> {
        if session.access_token.expose_secret().is_empty() {
            return Err(RepositoryError::Conflict(
                "session access token must be non-empty".to_owned(),
            ));
        }

        sqlx::query(
            r"
            INSERT INTO sessions
                (shop, access_token, storefront_token, scope, is_online, expires_at, custom_domain)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (shop) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                storefront_token = EXCLUDED.storefront_token,
                scope = EXCLUDED.scope,
                is_online = EXCLUDED.is_online,
                expires_at = EXCLUDED.expires_at,
                custom_domain = EXCLUDED.custom_domain,
                updated_at = (CURRENT_TIMESTAMP AT TIME ZONE 'utc')
            ",
        )
        .bind(session.shop.as_str())
        .bind(session.access_token.expose_secret())
        .bind(
            session
                .storefront_token
                .as_ref()
                .map(ExposeSecret::expose_secret),
        )
        .bind(&session.scope)
        .bind(session.is_online)
        .bind(session.expires_at)
        .bind(&session.custom_domain)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Get the session for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, shop: &ShopDomain) -> Result<Option<Session>, RepositoryError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r"
            SELECT shop, access_token, storefront_token, scope, is_online,
                   expires_at, custom_domain
            FROM sessions
            WHERE shop = $1
            ",
        )
        .bind(shop.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(Session::try_from).transpose()
    }

    /// Delete the session for a shop; returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, shop: &ShopDomain) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE shop = $1")
            .bind(shop.as_str())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session() -> Session {
        Session {
            shop: ShopDomain::parse("demo.myshopify.com").expect("valid shop"),
            access_token: SecretString::from("shpat_abc123"),
            storefront_token: Some(SecretString::from("shpsf_def456")),
            scope: "read_products,read_orders".to_owned(),
            is_online: false,
            expires_at: None,
            custom_domain: Some("shop.example.com".to_owned()),
        }
    }

    #[test]
    fn debug_redacts_tokens() {
        let debug = format!("{:?}", sample_session());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("shpat_abc123"));
        assert!(!debug.contains("shpsf_def456"));
    }

    #[test]
    fn row_conversion_validates_the_shop_domain() {
        let row = SessionRow {
            shop: "not-a-shop-domain".to_owned(),
            access_token: "token".to_owned(),
            storefront_token: None,
            scope: String::new(),
            is_online: false,
            expires_at: None,
            custom_domain: None,
        };

        assert!(matches!(
            Session::try_from(row),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
