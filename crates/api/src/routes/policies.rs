//! Shop policy routes.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::ShopSession;
use crate::retry::call_upstream;
use crate::shopify::ShopPolicy;
use crate::state::AppState;

/// Build the policies router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/policies", get(list))
        .route("/policies", post(list))
}

#[derive(Debug, Serialize)]
pub struct PoliciesResponse {
    pub policies: Vec<ShopPolicy>,
}

/// GET|POST /policies - the shop's published policies.
#[instrument(skip(state, auth), fields(shop = %auth.shop))]
async fn list(State(state): State<AppState>, auth: ShopSession) -> Result<Json<PoliciesResponse>> {
    let client = state.shopify().clone();
    let shop = auth.shop.clone();
    let token = auth.session.access_token.clone();

    let policies = call_upstream(move || {
        let client = client.clone();
        let shop = shop.clone();
        let token = token.clone();
        async move { client.shop_policies(&shop, &token).await }
    })
    .await?;

    Ok(Json(PoliciesResponse { policies }))
}
