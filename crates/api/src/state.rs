//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::cache::TtlCache;
use crate::config::ApiConfig;
use crate::services::TryOnClient;
use crate::shopify::{ProductSummary, ShopifyClient};

/// Product listings stay cached for five minutes per shop.
const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; provides access to the database pool,
/// external clients, and the product cache.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    shopify: ShopifyClient,
    tryon: TryOnClient,
    product_cache: TtlCache<String, Vec<ProductSummary>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool) -> Self {
        let shopify = ShopifyClient::new(&config.shopify);
        let tryon = TryOnClient::new(&config.tryon);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                shopify,
                tryon,
                product_cache: TtlCache::new(PRODUCT_CACHE_TTL),
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the Shopify Admin API client.
    #[must_use]
    pub fn shopify(&self) -> &ShopifyClient {
        &self.inner.shopify
    }

    /// Get a reference to the try-on generation client.
    #[must_use]
    pub fn tryon(&self) -> &TryOnClient {
        &self.inner.tryon
    }

    /// Get a reference to the per-shop product cache.
    #[must_use]
    pub fn product_cache(&self) -> &TtlCache<String, Vec<ProductSummary>> {
        &self.inner.product_cache
    }
}
