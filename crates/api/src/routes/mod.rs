//! HTTP route handlers for the widget API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (database ping)
//!
//! # OAuth (merchant install flow)
//! GET  /auth/install               - Redirect to Shopify authorize page
//! GET  /auth/oauth                 - OAuth callback, stores the session
//!
//! # Widget (authenticated: shop parameter or X-Shopify-Shop-Domain header)
//! GET  /products                   - Cached product listing
//! GET  /orders                     - Order lookup (order_number or email)
//! POST /orders                     - Same, JSON body
//! GET  /policies                   - Shop policy listing
//! POST /policies                   - Same
//! POST /tickets                    - Record a support ticket as a note
//! POST /chat                       - Classifier-routed chat answer
//! POST /images                     - Save a user photo (upsert per kind)
//! GET  /images                     - List a user's photos
//! POST /tryon                      - Generate a try-on image
//!
//! # Webhooks (signed by Shopify)
//! POST /webhooks/app-uninstalled   - Delete the shop session
//! POST /webhooks/orders-create     - Mirror the order locally
//! ```

use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod chat;
pub mod images;
pub mod orders;
pub mod policies;
pub mod products;
pub mod tickets;
pub mod tryon;
pub mod webhooks;

/// Build the application router (health endpoints live in `main`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(chat::router())
        .merge(images::router())
        .merge(orders::router())
        .merge(policies::router())
        .merge(products::router())
        .merge(tickets::router())
        .merge(tryon::router())
        .merge(webhooks::router())
}
