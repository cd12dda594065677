//! Support ticket route.
//!
//! A ticket is a support request recorded as a note on the shop's order or
//! customer record - there is no separate ticketing system. The note keeps
//! its history: new tickets append below a divider rather than replacing
//! what a merchant (or a previous ticket) wrote.

use axum::{Json, Router, extract::State, routing::post};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use vestia_core::Email;

use crate::error::{AppError, Result};
use crate::middleware::ShopSession;
use crate::retry::call_upstream;
use crate::state::AppState;

/// Build the tickets router.
pub fn router() -> Router<AppState> {
    Router::new().route("/tickets", post(create))
}

#[derive(Debug, Deserialize)]
pub struct TicketRequest {
    pub message: String,
    pub subject: Option<String>,
    pub order_number: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    /// Where the ticket landed, e.g. `order #1042` or `customer a@b.com`.
    pub recorded_on: String,
}

/// Render the appended ticket block.
fn ticket_block(req: &TicketRequest) -> String {
    let timestamp = Utc::now().to_rfc3339();
    let subject = req.subject.as_deref().unwrap_or("Support request");
    let from = req
        .email
        .as_deref()
        .map(|e| format!(" (from {e})"))
        .unwrap_or_default();

    format!("[{timestamp}] {subject}{from}:\n{}", req.message.trim())
}

/// Append a block to an existing note, keeping prior content.
fn append_note(existing: Option<&str>, block: &str) -> String {
    match existing.filter(|n| !n.trim().is_empty()) {
        Some(existing) => format!("{existing}\n---\n{block}"),
        None => block.to_owned(),
    }
}

/// POST /tickets - record a support ticket on an order or customer.
#[instrument(skip(state, auth, req), fields(shop = %auth.shop))]
async fn create(
    State(state): State<AppState>,
    auth: ShopSession,
    Json(req): Json<TicketRequest>,
) -> Result<Json<TicketResponse>> {
    if req.message.trim().is_empty() {
        return Err(AppError::Validation("message cannot be empty".to_owned()));
    }

    let client = state.shopify().clone();
    let shop = auth.shop.clone();
    let token = auth.session.access_token.clone();
    let block = ticket_block(&req);

    // Prefer the order record when the ticket names an order.
    if let Some(number) = req.order_number.as_deref().filter(|n| !n.is_empty()) {
        let order = {
            let client = client.clone();
            let shop = shop.clone();
            let token = token.clone();
            let number = number.to_owned();
            call_upstream(move || {
                let client = client.clone();
                let shop = shop.clone();
                let token = token.clone();
                let number = number.clone();
                async move { client.find_order_by_number(&shop, &token, &number).await }
            })
            .await?
        }
        .ok_or_else(|| AppError::NotFound("order not found".to_owned()))?;

        let note = append_note(order.note.as_deref(), &block);
        let order_id = order.id.clone();
        call_upstream(move || {
            let client = client.clone();
            let shop = shop.clone();
            let token = token.clone();
            let order_id = order_id.clone();
            let note = note.clone();
            async move { client.update_order_note(&shop, &token, &order_id, &note).await }
        })
        .await?;

        tracing::info!(shop = %auth.shop, order = %order.name, "Ticket recorded on order");
        return Ok(Json(TicketResponse {
            recorded_on: format!("order {}", order.name),
        }));
    }

    // Otherwise fall back to the customer record.
    let raw_email = req
        .email
        .as_deref()
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::Validation("provide order_number or email".to_owned()))?;
    let email =
        Email::parse(raw_email).map_err(|e| AppError::Validation(format!("invalid email: {e}")))?;

    let customer = {
        let client = client.clone();
        let shop = shop.clone();
        let token = token.clone();
        let email = email.clone();
        call_upstream(move || {
            let client = client.clone();
            let shop = shop.clone();
            let token = token.clone();
            let email = email.clone();
            async move { client.find_customer_by_email(&shop, &token, email.as_str()).await }
        })
        .await?
    }
    .ok_or_else(|| AppError::NotFound("no customer with that email".to_owned()))?;

    let note = append_note(customer.note.as_deref(), &block);
    let customer_id = customer.id.clone();
    call_upstream(move || {
        let client = client.clone();
        let shop = shop.clone();
        let token = token.clone();
        let customer_id = customer_id.clone();
        let note = note.clone();
        async move {
            client
                .update_customer_note(&shop, &token, &customer_id, &note)
                .await
        }
    })
    .await?;

    tracing::info!(shop = %auth.shop, "Ticket recorded on customer");
    Ok(Json(TicketResponse {
        recorded_on: format!("customer {email}"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(message: &str) -> TicketRequest {
        TicketRequest {
            message: message.to_owned(),
            subject: Some("Wrong size".to_owned()),
            order_number: None,
            email: Some("a@b.com".to_owned()),
        }
    }

    #[test]
    fn ticket_blocks_carry_subject_and_sender() {
        let block = ticket_block(&request("The shirt runs small."));
        assert!(block.contains("Wrong size"));
        assert!(block.contains("(from a@b.com)"));
        assert!(block.ends_with("The shirt runs small."));
    }

    #[test]
    fn appending_keeps_prior_notes() {
        let appended = append_note(Some("VIP customer"), "new ticket");
        assert_eq!(appended, "VIP customer\n---\nnew ticket");

        assert_eq!(append_note(None, "new ticket"), "new ticket");
        assert_eq!(append_note(Some("   "), "new ticket"), "new ticket");
    }
}
