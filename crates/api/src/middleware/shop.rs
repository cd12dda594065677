//! Shop session extraction for authenticated routes.
//!
//! Every authenticated route follows the same contract: the request names a
//! shop (query parameter or `X-Shopify-Shop-Domain` header), the shop must
//! have a stored session, and the session's access token must be non-empty.
//! Missing shop → 400; missing/empty session → 401.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use secrecy::ExposeSecret;

use vestia_core::ShopDomain;

use crate::db::{Session, SessionRepository};
use crate::error::AppError;
use crate::state::AppState;

use super::cors::SHOP_DOMAIN_HEADER;

/// The requesting shop and its stored session.
///
/// Use as an extractor argument on any route that calls an upstream API on
/// the shop's behalf.
#[derive(Debug)]
pub struct ShopSession {
    pub shop: ShopDomain,
    pub session: Session,
}

impl FromRequestParts<AppState> for ShopSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw_shop = shop_from_parts(parts)
            .ok_or_else(|| AppError::Validation("missing shop parameter".to_owned()))?;

        let shop = ShopDomain::parse(&raw_shop)
            .map_err(|e| AppError::Validation(format!("invalid shop parameter: {e}")))?;

        let session = SessionRepository::new(state.pool())
            .get(&shop)
            .await?
            .ok_or_else(|| {
                AppError::Unauthorized(format!("no session for {shop}; install the app first"))
            })?;

        if session.access_token.expose_secret().is_empty() {
            return Err(AppError::Unauthorized(format!(
                "session for {shop} has no access token; reinstall the app"
            )));
        }

        Ok(Self { shop, session })
    }
}

/// Pull the shop domain from `?shop=` or the widget's shop header.
fn shop_from_parts(parts: &Parts) -> Option<String> {
    let from_query = parts.uri.query().and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "shop")
            .map(|(_, value)| value.into_owned())
    });

    from_query.or_else(|| {
        parts
            .headers
            .get(SHOP_DOMAIN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    })
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_for(uri: &str, header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = header {
            builder = builder.header(SHOP_DOMAIN_HEADER, value);
        }
        let (parts, ()) = builder.body(()).expect("request builds").into_parts();
        parts
    }

    #[test]
    fn query_parameter_wins_over_header() {
        let parts = parts_for(
            "/orders?shop=a.myshopify.com&x=1",
            Some("b.myshopify.com"),
        );
        assert_eq!(shop_from_parts(&parts).as_deref(), Some("a.myshopify.com"));
    }

    #[test]
    fn header_is_the_fallback() {
        let parts = parts_for("/orders", Some("b.myshopify.com"));
        assert_eq!(shop_from_parts(&parts).as_deref(), Some("b.myshopify.com"));
    }

    #[test]
    fn absent_everywhere_is_none() {
        let parts = parts_for("/orders?other=x", None);
        assert_eq!(shop_from_parts(&parts), None);
    }
}
