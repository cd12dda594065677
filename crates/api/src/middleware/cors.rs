//! CORS configuration for the storefront widget.
//!
//! The widget is injected into merchant storefronts, so requests arrive from
//! every `*.myshopify.com` origin. Merchants' custom domains are not
//! allowed here; custom-domain storefronts go through the Shopify app proxy
//! instead. Localhost is allowed for widget development.

use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// The widget sends its shop context in this header on non-GET requests.
pub const SHOP_DOMAIN_HEADER: &str = "x-shopify-shop-domain";

/// Build the CORS layer for all widget-facing routes.
///
/// Allowed origins echo back `Access-Control-Allow-Origin`, credentials are
/// allowed, and preflight results may be cached for a day.
#[must_use]
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
            origin.to_str().is_ok_and(is_allowed_origin)
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static(SHOP_DOMAIN_HEADER),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86_400))
}

/// True for `https://*.myshopify.com` and localhost (any scheme/port).
fn is_allowed_origin(origin: &str) -> bool {
    let Some(host) = origin
        .strip_prefix("https://")
        .or_else(|| origin.strip_prefix("http://"))
    else {
        return false;
    };

    // Strip any port before matching the host.
    let host = host.split(':').next().unwrap_or(host);

    if host == "localhost" || host == "127.0.0.1" {
        return true;
    }

    host.ends_with(".myshopify.com") && host.len() > ".myshopify.com".len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_myshopify_origins() {
        assert!(is_allowed_origin("https://demo-store.myshopify.com"));
        assert!(is_allowed_origin("https://a.myshopify.com"));
    }

    #[test]
    fn allows_localhost_for_development() {
        assert!(is_allowed_origin("http://localhost:3000"));
        assert!(is_allowed_origin("http://127.0.0.1:8080"));
        assert!(is_allowed_origin("https://localhost"));
    }

    #[test]
    fn rejects_everything_else() {
        assert!(!is_allowed_origin("https://evil.example.com"));
        assert!(!is_allowed_origin("https://myshopify.com"));
        assert!(!is_allowed_origin("https://.myshopify.com"));
        assert!(!is_allowed_origin("https://foo.myshopify.com.evil.com"));
        assert!(!is_allowed_origin("ftp://demo.myshopify.com"));
        assert!(!is_allowed_origin(""));
    }
}
