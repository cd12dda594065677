//! Order records mirrored from the orders-create webhook.
//!
//! Shopify stays the source of truth for orders; this table exists so the
//! widget can show purchase counts and recent activity without an Admin API
//! round trip. Inserts are idempotent on (shop, order id) because Shopify
//! redelivers webhooks.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use vestia_core::ShopDomain;

use super::RepositoryError;

/// Currency recorded when the webhook payload omits one.
pub const DEFAULT_CURRENCY: &str = "USD";

// =============================================================================
// Types
// =============================================================================

/// A stored order record.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OrderRecord {
    pub shop: ShopDomain,
    pub shopify_order_id: String,
    pub total_price: Decimal,
    pub currency_code: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for an insert.
#[derive(Debug, Clone)]
pub struct NewOrderRecord {
    pub shop: ShopDomain,
    pub shopify_order_id: String,
    pub total_price: Decimal,
    /// Defaults to [`DEFAULT_CURRENCY`] when `None`.
    pub currency_code: Option<String>,
    pub email: Option<String>,
}

/// Internal row type for `PostgreSQL` queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    shop: String,
    shopify_order_id: String,
    total_price: Decimal,
    currency_code: String,
    email: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for OrderRecord {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let shop = ShopDomain::parse(&row.shop)
            .map_err(|e| RepositoryError::DataCorruption(format!("bad shop domain: {e}")))?;

        Ok(Self {
            shop,
            shopify_order_id: row.shopify_order_id,
            total_price: row.total_price,
            currency_code: row.currency_code,
            email: row.email,
            created_at: row.created_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order record database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order record; redeliveries of the same order are ignored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert(&self, new: &NewOrderRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO orders (shop, shopify_order_id, total_price, currency_code, email)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (shop, shopify_order_id) DO NOTHING
            ",
        )
        .bind(new.shop.as_str())
        .bind(&new.shopify_order_id)
        .bind(new.total_price)
        .bind(new.currency_code.as_deref().unwrap_or(DEFAULT_CURRENCY))
        .bind(&new.email)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Get one order record by its Shopify order id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        shop: &ShopDomain,
        shopify_order_id: &str,
    ) -> Result<Option<OrderRecord>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r"
            SELECT shop, shopify_order_id, total_price, currency_code, email, created_at
            FROM orders
            WHERE shop = $1 AND shopify_order_id = $2
            ",
        )
        .bind(shop.as_str())
        .bind(shopify_order_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(OrderRecord::try_from).transpose()
    }

    /// Recent order records for a shop, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_for_shop(
        &self,
        shop: &ShopDomain,
        limit: i64,
    ) -> Result<Vec<OrderRecord>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r"
            SELECT shop, shopify_order_id, total_price, currency_code, email, created_at
            FROM orders
            WHERE shop = $1
            ORDER BY created_at DESC
            LIMIT $2
            ",
        )
        .bind(shop.as_str())
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(OrderRecord::try_from).collect()
    }
}
