//! Shopify app install and OAuth callback routes.
//!
//! Install flow: `GET /auth/install?shop=` sends the merchant to Shopify's
//! authorize page with a signed state nonce; Shopify redirects back to
//! `GET /auth/oauth` where the callback HMAC and state are verified, the
//! code is exchanged for an Admin token, a storefront token is minted
//! best-effort, and the session is upserted.
//!
//! The state nonce is HMAC-signed and time-boxed rather than stored: the
//! widget API carries no cookie sessions, so CSRF protection has to be
//! stateless.

use axum::{
    Router,
    extract::{Query, State},
    response::Redirect,
    routing::get,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use tracing::instrument;

use vestia_core::ShopDomain;

use crate::db::{Session, SessionRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Signed state nonces expire after ten minutes.
const STATE_TTL_SECS: i64 = 600;

type HmacSha256 = Hmac<Sha256>;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/install", get(install))
        .route("/auth/oauth", get(callback))
}

// =============================================================================
// Query Parameters
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct InstallParams {
    pub shop: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub shop: Option<String>,
    pub hmac: Option<String>,
    pub timestamp: Option<String>,
    pub host: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

// =============================================================================
// HMAC Verification
// =============================================================================

/// Verify the HMAC signature from a Shopify OAuth callback.
///
/// The message is the sorted `key=value` pairs of every parameter except
/// `hmac` itself, joined with `&`, signed with the app secret (hex output).
fn verify_shopify_hmac(params: &OAuthCallbackParams, client_secret: &SecretString) -> bool {
    let Some(provided_hmac) = &params.hmac else {
        return false;
    };

    let mut param_pairs: Vec<(&str, &String)> = Vec::new();
    if let Some(v) = &params.code {
        param_pairs.push(("code", v));
    }
    if let Some(v) = &params.host {
        param_pairs.push(("host", v));
    }
    if let Some(v) = &params.shop {
        param_pairs.push(("shop", v));
    }
    if let Some(v) = &params.state {
        param_pairs.push(("state", v));
    }
    if let Some(v) = &params.timestamp {
        param_pairs.push(("timestamp", v));
    }

    // Sort alphabetically by key
    param_pairs.sort_by(|a, b| a.0.cmp(b.0));

    let message: String = param_pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let Ok(mut mac) = HmacSha256::new_from_slice(client_secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(message.as_bytes());

    let Ok(provided) = hex::decode(provided_hmac) else {
        return false;
    };
    mac.verify_slice(&provided).is_ok()
}

// =============================================================================
// Signed state
// =============================================================================

fn sign_state(secret: &SecretString, nonce: &str, timestamp: i64) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()).ok()?;
    mac.update(format!("{nonce}.{timestamp}").as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Mint a fresh `nonce.timestamp.signature` state value.
fn make_state(secret: &SecretString) -> Option<String> {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    let timestamp = Utc::now().timestamp();
    let sig = sign_state(secret, &nonce, timestamp)?;
    Some(format!("{nonce}.{timestamp}.{sig}"))
}

/// Check a state value's signature and age.
fn verify_state(secret: &SecretString, state: &str) -> bool {
    let mut parts = state.splitn(3, '.');
    let (Some(nonce), Some(raw_ts), Some(provided_sig)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    let Ok(timestamp) = raw_ts.parse::<i64>() else {
        return false;
    };

    let age = Utc::now().timestamp() - timestamp;
    if !(0..=STATE_TTL_SECS).contains(&age) {
        return false;
    }

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(format!("{nonce}.{timestamp}").as_bytes());

    let Ok(provided) = hex::decode(provided_sig) else {
        return false;
    };
    mac.verify_slice(&provided).is_ok()
}

// =============================================================================
// Route Handlers
// =============================================================================

/// GET /auth/install - Start the OAuth flow for a shop.
#[instrument(skip(state))]
async fn install(
    State(state): State<AppState>,
    Query(params): Query<InstallParams>,
) -> Result<Redirect> {
    let raw_shop = params
        .shop
        .ok_or_else(|| AppError::Validation("missing shop parameter".to_owned()))?;
    let shop = ShopDomain::parse(&raw_shop)
        .map_err(|e| AppError::Validation(format!("invalid shop parameter: {e}")))?;

    let secret = &state.config().shopify.api_secret;
    let oauth_state = make_state(secret)
        .ok_or_else(|| AppError::Internal("failed to sign OAuth state".to_owned()))?;

    let redirect_uri = format!("{}/auth/oauth", state.config().base_url);
    let auth_url = state.shopify().authorization_url(
        &shop,
        &redirect_uri,
        &state.config().shopify.scopes,
        &oauth_state,
    );

    tracing::info!(shop = %shop, "Redirecting to Shopify OAuth");
    Ok(Redirect::to(&auth_url))
}

/// GET /auth/oauth - Handle the OAuth callback.
#[instrument(skip(state, params))]
async fn callback(
    State(state): State<AppState>,
    Query(params): Query<OAuthCallbackParams>,
) -> Result<Redirect> {
    // Check for errors from Shopify
    if let Some(error) = &params.error {
        let description = params.error_description.as_deref().unwrap_or_default();
        tracing::error!(error = %error, description = %description, "Shopify OAuth error");
        return Err(AppError::Unauthorized("OAuth authorization denied".to_owned()));
    }

    let secret = state.config().shopify.api_secret.clone();

    // Verify HMAC signature from Shopify
    if !verify_shopify_hmac(&params, &secret) {
        tracing::error!("Invalid HMAC signature in OAuth callback");
        return Err(AppError::Unauthorized("invalid callback signature".to_owned()));
    }

    // Verify our signed state (CSRF + replay window)
    let valid_state = params
        .state
        .as_deref()
        .is_some_and(|s| verify_state(&secret, s));
    if !valid_state {
        tracing::error!("Invalid or expired OAuth state");
        return Err(AppError::Unauthorized("invalid OAuth state".to_owned()));
    }

    let raw_shop = params
        .shop
        .ok_or_else(|| AppError::Validation("missing shop parameter".to_owned()))?;
    let shop = ShopDomain::parse(&raw_shop)
        .map_err(|e| AppError::Validation(format!("invalid shop parameter: {e}")))?;

    let code = params
        .code
        .ok_or_else(|| AppError::Validation("missing authorization code".to_owned()))?;

    // Exchange code for token
    let token = state
        .shopify()
        .exchange_code(&shop, &code)
        .await
        .map_err(AppError::from)?;
    let access_token = SecretString::from(token.access_token);

    // Mint a storefront token for customer-facing product queries.
    // Best-effort: the widget works without one, so log and continue.
    let storefront_token = match state
        .shopify()
        .create_storefront_token(&shop, &access_token)
        .await
    {
        Ok(t) => Some(SecretString::from(t)),
        Err(e) => {
            tracing::warn!(shop = %shop, error = %e, "Failed to create storefront token");
            None
        }
    };

    let session = Session {
        shop: shop.clone(),
        access_token,
        storefront_token,
        scope: token.scope,
        is_online: false,
        expires_at: None,
        custom_domain: None,
    };

    SessionRepository::new(state.pool()).store(&session).await?;

    tracing::info!(shop = %shop, "App installed");

    // Land the merchant back on the app inside the Shopify admin.
    let app_home = format!("https://{shop}/admin/apps/{}", state.config().shopify.api_key);
    Ok(Redirect::to(&app_home))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("shpss_test_secret")
    }

    #[test]
    fn state_round_trips() {
        let secret = secret();
        let state = make_state(&secret).expect("state");
        assert!(verify_state(&secret, &state));
    }

    #[test]
    fn state_rejects_tampering_and_wrong_secret() {
        let secret = secret();
        let state = make_state(&secret).expect("state");

        assert!(!verify_state(&secret, &format!("{state}x")));
        assert!(!verify_state(&SecretString::from("other"), &state));
        assert!(!verify_state(&secret, "not.a.state"));
        assert!(!verify_state(&secret, ""));
    }

    #[test]
    fn state_rejects_expired_nonces() {
        let secret = secret();
        let nonce = "abc";
        let old = Utc::now().timestamp() - STATE_TTL_SECS - 1;
        let sig = sign_state(&secret, nonce, old).expect("sig");
        assert!(!verify_state(&secret, &format!("{nonce}.{old}.{sig}")));
    }

    #[test]
    fn callback_hmac_verifies_sorted_params() {
        let secret = secret();
        let mut params = OAuthCallbackParams {
            code: Some("c0de".to_owned()),
            state: Some("st".to_owned()),
            shop: Some("demo.myshopify.com".to_owned()),
            hmac: None,
            timestamp: Some("1700000000".to_owned()),
            host: None,
            error: None,
            error_description: None,
        };

        // Sign the message the way Shopify does
        let message = "code=c0de&shop=demo.myshopify.com&state=st&timestamp=1700000000";
        let mut mac =
            HmacSha256::new_from_slice(secret.expose_secret().as_bytes()).expect("mac");
        mac.update(message.as_bytes());
        params.hmac = Some(hex::encode(mac.finalize().into_bytes()));

        assert!(verify_shopify_hmac(&params, &secret));

        params.shop = Some("other.myshopify.com".to_owned());
        assert!(!verify_shopify_hmac(&params, &secret));
    }

    #[test]
    fn callback_hmac_requires_the_header() {
        let params = OAuthCallbackParams {
            code: None,
            state: None,
            shop: None,
            hmac: None,
            timestamp: None,
            host: None,
            error: None,
            error_description: None,
        };
        assert!(!verify_shopify_hmac(&params, &secret()));
    }
}
