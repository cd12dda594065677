//! Product listing route.
//!
//! Listings are cached per shop for five minutes; the widget's product rail
//! tolerates that staleness and the cache keeps Admin API calls well under
//! the rate limit.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::ShopSession;
use crate::retry::call_upstream;
use crate::shopify::ProductSummary;
use crate::state::AppState;

/// How many products the widget rail shows.
const PRODUCT_PAGE_SIZE: u32 = 24;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new().route("/products", get(list))
}

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<ProductSummary>,
    /// True when this response came from the cache.
    pub cached: bool,
}

/// GET /products - cached product listing for the widget rail.
#[instrument(skip(state, auth), fields(shop = %auth.shop))]
async fn list(State(state): State<AppState>, auth: ShopSession) -> Result<Json<ProductsResponse>> {
    let cache_key = auth.shop.as_str().to_owned();

    if let Some(products) = state.product_cache().get(&cache_key) {
        return Ok(Json(ProductsResponse {
            products,
            cached: true,
        }));
    }

    let client = state.shopify().clone();
    let shop = auth.shop.clone();
    let token = auth.session.access_token.clone();

    let products = call_upstream(move || {
        let client = client.clone();
        let shop = shop.clone();
        let token = token.clone();
        async move { client.list_products(&shop, &token, PRODUCT_PAGE_SIZE).await }
    })
    .await?;

    state.product_cache().insert(cache_key, products.clone());

    Ok(Json(ProductsResponse {
        products,
        cached: false,
    }))
}
