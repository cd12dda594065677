//! Chat route.
//!
//! The widget's chat box routes through the keyword classifier first: order
//! and policy questions are answered from live Shopify data instead of going
//! to the assistant, which keeps the common support questions fast and
//! grounded. A message may match several intents; routing checks order, then
//! policy, then account - that is serving order, not classifier precedence.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use vestia_core::{Email, QueryType, classify};

use crate::error::{AppError, Result};
use crate::middleware::ShopSession;
use crate::retry::call_upstream;
use crate::shopify::{OrderSummary, ShopPolicy};
use crate::state::AppState;

use super::orders::OrderView;

/// How many orders an account-history answer includes.
const HISTORY_LIMIT: u32 = 5;

/// Build the chat router.
pub fn router() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// The assistant's reply text.
    pub reply: String,
    /// How the message was classified (the widget uses this for UI hints).
    pub query: QueryType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orders: Vec<OrderView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<ShopPolicy>,
}

/// POST /chat - classify the message and answer from Shopify data.
#[instrument(skip(state, auth, req), fields(shop = %auth.shop))]
async fn chat(
    State(state): State<AppState>,
    auth: ShopSession,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    if req.message.trim().is_empty() {
        return Err(AppError::Validation("message cannot be empty".to_owned()));
    }

    let query = classify(&req.message);

    // Order questions with a handle we can look up.
    if query.is_order {
        if let Some(number) = query.order_number.clone() {
            let orders = order_by_number(&state, &auth, number).await?;
            return Ok(Json(respond_orders(query, orders)));
        }
        if let Some(email) = query.email.clone() {
            let orders = orders_by_email(&state, &auth, email).await?;
            return Ok(Json(respond_orders(query, orders)));
        }
    }

    if query.is_policy {
        let policies = shop_policies(&state, &auth).await?;
        let reply = policy_reply(&policies);
        return Ok(Json(ChatResponse {
            reply,
            query,
            orders: Vec::new(),
            policies,
        }));
    }

    if query.is_account {
        if let Some(email) = query.email.clone() {
            let orders = orders_by_email(&state, &auth, email).await?;
            return Ok(Json(respond_orders(query, orders)));
        }
        return Ok(Json(ChatResponse {
            reply: "Share the email you ordered with and I can pull up your purchase history."
                .to_owned(),
            query,
            orders: Vec::new(),
            policies: Vec::new(),
        }));
    }

    // Order question without a number or email - ask for one.
    if query.is_order {
        return Ok(Json(ChatResponse {
            reply: "I can check on an order for you - what's the order number (like #1042), \
                    or the email you ordered with?"
                .to_owned(),
            query,
            orders: Vec::new(),
            policies: Vec::new(),
        }));
    }

    Ok(Json(ChatResponse {
        reply: "I can help you try on products, check an order's status, or answer questions \
                about shipping and returns. What would you like to do?"
            .to_owned(),
        query,
        orders: Vec::new(),
        policies: Vec::new(),
    }))
}

// =============================================================================
// Upstream lookups
// =============================================================================

async fn order_by_number(
    state: &AppState,
    auth: &ShopSession,
    number: String,
) -> Result<Vec<OrderSummary>> {
    let client = state.shopify().clone();
    let shop = auth.shop.clone();
    let token = auth.session.access_token.clone();

    let order = call_upstream(move || {
        let client = client.clone();
        let shop = shop.clone();
        let token = token.clone();
        let number = number.clone();
        async move { client.find_order_by_number(&shop, &token, &number).await }
    })
    .await?;

    Ok(order.into_iter().collect())
}

async fn orders_by_email(
    state: &AppState,
    auth: &ShopSession,
    email: Email,
) -> Result<Vec<OrderSummary>> {
    let client = state.shopify().clone();
    let shop = auth.shop.clone();
    let token = auth.session.access_token.clone();

    Ok(call_upstream(move || {
        let client = client.clone();
        let shop = shop.clone();
        let token = token.clone();
        let email = email.clone();
        async move {
            client
                .find_orders_by_email(&shop, &token, email.as_str(), HISTORY_LIMIT)
                .await
        }
    })
    .await?)
}

async fn shop_policies(state: &AppState, auth: &ShopSession) -> Result<Vec<ShopPolicy>> {
    let client = state.shopify().clone();
    let shop = auth.shop.clone();
    let token = auth.session.access_token.clone();

    Ok(call_upstream(move || {
        let client = client.clone();
        let shop = shop.clone();
        let token = token.clone();
        async move { client.shop_policies(&shop, &token).await }
    })
    .await?)
}

// =============================================================================
// Reply rendering
// =============================================================================

fn respond_orders(query: QueryType, orders: Vec<OrderSummary>) -> ChatResponse {
    let reply = order_reply(&orders);
    ChatResponse {
        reply,
        query,
        orders: orders.into_iter().map(OrderView::from).collect(),
        policies: Vec::new(),
    }
}

fn order_reply(orders: &[OrderSummary]) -> String {
    match orders {
        [] => "I couldn't find a matching order. Double-check the order number or email?"
            .to_owned(),
        [order] => {
            let mut reply = format!(
                "Order {} is {} and payment is {}.",
                order.name,
                order.fulfillment_status.to_lowercase(),
                order.financial_status.to_lowercase()
            );
            if let Some(tracking) = order.tracking.first() {
                match (&tracking.company, &tracking.number) {
                    (Some(company), Some(number)) => {
                        reply.push_str(&format!(" Tracking: {company} {number}."));
                    }
                    (None, Some(number)) => reply.push_str(&format!(" Tracking: {number}.")),
                    _ => {}
                }
            }
            reply
        }
        many => {
            let names: Vec<&str> = many.iter().map(|o| o.name.as_str()).collect();
            format!(
                "I found {} recent orders: {}. Ask about one of them for details.",
                many.len(),
                names.join(", ")
            )
        }
    }
}

fn policy_reply(policies: &[ShopPolicy]) -> String {
    if policies.is_empty() {
        return "This store hasn't published its policies yet - the support team can help."
            .to_owned();
    }

    let titles: Vec<&str> = policies.iter().map(|p| p.title.as_str()).collect();
    format!(
        "Here's what this store has published: {}. I've attached the full text below.",
        titles.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(name: &str) -> OrderSummary {
        OrderSummary {
            id: format!("gid://shopify/Order/{name}"),
            name: name.to_owned(),
            created_at: "2026-01-05T12:00:00Z".to_owned(),
            email: None,
            note: None,
            fulfillment_status: "FULFILLED".to_owned(),
            financial_status: "PAID".to_owned(),
            total: None,
            tracking: vec![crate::shopify::TrackingInfo {
                company: Some("UPS".to_owned()),
                number: Some("1Z999".to_owned()),
                url: None,
            }],
        }
    }

    #[test]
    fn single_order_replies_include_status_and_tracking() {
        let reply = order_reply(&[order("#1042")]);
        assert!(reply.contains("#1042"));
        assert!(reply.contains("fulfilled"));
        assert!(reply.contains("UPS 1Z999"));
    }

    #[test]
    fn multiple_orders_are_listed_by_name() {
        let reply = order_reply(&[order("#1"), order("#2")]);
        assert!(reply.contains("2 recent orders"));
        assert!(reply.contains("#1, #2"));
    }

    #[test]
    fn empty_lookups_ask_for_better_handles() {
        assert!(order_reply(&[]).contains("couldn't find"));
    }

    #[test]
    fn policy_replies_list_titles() {
        let policies = vec![ShopPolicy {
            kind: "REFUND_POLICY".to_owned(),
            title: "Refund policy".to_owned(),
            body: "<p>30 days</p>".to_owned(),
            url: None,
        }];
        assert!(policy_reply(&policies).contains("Refund policy"));
        assert!(policy_reply(&[]).contains("hasn't published"));
    }
}
