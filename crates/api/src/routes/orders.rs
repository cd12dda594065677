//! Order lookup routes.
//!
//! The widget asks about orders two ways: a specific order number, or a
//! customer email for recent history. Both arrive as `GET /orders` with
//! query parameters or `POST /orders` with a JSON body.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use vestia_core::Email;

use crate::error::{AppError, Result};
use crate::middleware::ShopSession;
use crate::retry::call_upstream;
use crate::shopify::{Money, OrderSummary, TrackingInfo};
use crate::state::AppState;

/// How many orders an email lookup returns.
const EMAIL_LOOKUP_LIMIT: u32 = 5;

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(lookup_get))
        .route("/orders", post(lookup_post))
}

#[derive(Debug, Deserialize)]
pub struct OrderLookupParams {
    pub order_number: Option<String>,
    pub email: Option<String>,
}

/// Order data returned to the widget.
///
/// Deliberately excludes the Shopify order id and the internal note (which
/// holds support tickets).
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub name: String,
    pub created_at: String,
    pub fulfillment_status: String,
    pub financial_status: String,
    pub total: Option<Money>,
    pub tracking: Vec<TrackingInfo>,
}

impl From<OrderSummary> for OrderView {
    fn from(order: OrderSummary) -> Self {
        Self {
            name: order.name,
            created_at: order.created_at,
            fulfillment_status: order.fulfillment_status,
            financial_status: order.financial_status,
            total: order.total,
            tracking: order.tracking,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<OrderView>,
}

/// GET /orders?shop=&order_number= or ?email=
async fn lookup_get(
    state: State<AppState>,
    auth: ShopSession,
    Query(params): Query<OrderLookupParams>,
) -> Result<Json<OrdersResponse>> {
    lookup(state, auth, params).await
}

/// POST /orders with the same fields as JSON.
async fn lookup_post(
    state: State<AppState>,
    auth: ShopSession,
    Json(params): Json<OrderLookupParams>,
) -> Result<Json<OrdersResponse>> {
    lookup(state, auth, params).await
}

#[instrument(skip(state, auth, params), fields(shop = %auth.shop))]
async fn lookup(
    State(state): State<AppState>,
    auth: ShopSession,
    params: OrderLookupParams,
) -> Result<Json<OrdersResponse>> {
    let client = state.shopify().clone();
    let shop = auth.shop.clone();
    let token = auth.session.access_token.clone();

    if let Some(number) = params.order_number.filter(|n| !n.is_empty()) {
        let order = call_upstream(move || {
            let client = client.clone();
            let shop = shop.clone();
            let token = token.clone();
            let number = number.clone();
            async move { client.find_order_by_number(&shop, &token, &number).await }
        })
        .await?
        .ok_or_else(|| AppError::NotFound("order not found".to_owned()))?;

        return Ok(Json(OrdersResponse {
            orders: vec![order.into()],
        }));
    }

    if let Some(raw_email) = params.email.filter(|e| !e.is_empty()) {
        let email = Email::parse(&raw_email)
            .map_err(|e| AppError::Validation(format!("invalid email: {e}")))?;

        let orders = call_upstream(move || {
            let client = client.clone();
            let shop = shop.clone();
            let token = token.clone();
            let email = email.clone();
            async move {
                client
                    .find_orders_by_email(&shop, &token, email.as_str(), EMAIL_LOOKUP_LIMIT)
                    .await
            }
        })
        .await?;

        return Ok(Json(OrdersResponse {
            orders: orders.into_iter().map(OrderView::from).collect(),
        }));
    }

    Err(AppError::Validation(
        "provide order_number or email".to_owned(),
    ))
}
