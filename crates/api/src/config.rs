//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `BASE_URL` - Public URL of this API (OAuth redirect target)
//! - `SHOPIFY_API_KEY` - Shopify app client id
//! - `SHOPIFY_API_SECRET` - Shopify app client secret
//! - `TRYON_API_URL` - Image-generation API endpoint
//! - `TRYON_API_KEY` - Image-generation API key
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3000)
//! - `SHOPIFY_SCOPES` - Requested OAuth scopes (default: read scopes below)
//! - `SHOPIFY_API_VERSION` - Admin API version (default: 2026-01)
//! - `TRYON_MODEL` - Generation model name (default: tryon-v2)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE`

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

/// Scopes requested when a shop installs the app.
const DEFAULT_SCOPES: &str = "read_products,read_orders,write_orders,read_customers,write_customers,unauthenticated_read_product_listings";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for this API
    pub base_url: String,
    /// Shopify app credentials
    pub shopify: ShopifyAppConfig,
    /// Image-generation API configuration
    pub tryon: TryOnConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0-1.0)
    pub sentry_sample_rate: f32,
    /// Sentry trace sample rate (0.0-1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Shopify app (partner dashboard) credentials.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct ShopifyAppConfig {
    /// App client id (public)
    pub api_key: String,
    /// App client secret - signs OAuth callbacks and webhooks
    pub api_secret: SecretString,
    /// Comma-separated OAuth scopes requested at install
    pub scopes: String,
    /// Admin API version (e.g. 2026-01)
    pub api_version: String,
}

impl std::fmt::Debug for ShopifyAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyAppConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Image-generation API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct TryOnConfig {
    /// API endpoint base URL
    pub endpoint: String,
    /// API key (Bearer token)
    pub api_key: SecretString,
    /// Model name sent with each generation request
    pub model: String,
}

impl std::fmt::Debug for TryOnConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TryOnConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if a secret looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = SecretString::from(required("DATABASE_URL")?);
        let base_url = required("BASE_URL")?.trim_end_matches('/').to_owned();

        let host: IpAddr = optional("HOST")
            .unwrap_or_else(|| "127.0.0.1".to_owned())
            .parse()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_owned(), format!("{e}")))?;

        let port: u16 = optional("PORT")
            .unwrap_or_else(|| "3000".to_owned())
            .parse()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_owned(), format!("{e}")))?;

        let shopify = ShopifyAppConfig {
            api_key: required("SHOPIFY_API_KEY")?,
            api_secret: validated_secret("SHOPIFY_API_SECRET")?,
            scopes: optional("SHOPIFY_SCOPES").unwrap_or_else(|| DEFAULT_SCOPES.to_owned()),
            api_version: optional("SHOPIFY_API_VERSION").unwrap_or_else(|| "2026-01".to_owned()),
        };

        let tryon = TryOnConfig {
            endpoint: required("TRYON_API_URL")?.trim_end_matches('/').to_owned(),
            api_key: validated_secret("TRYON_API_KEY")?,
            model: optional("TRYON_MODEL").unwrap_or_else(|| "tryon-v2".to_owned()),
        };

        let sentry_sample_rate = parse_rate("SENTRY_SAMPLE_RATE", 1.0)?;
        let sentry_traces_sample_rate = parse_rate("SENTRY_TRACES_SAMPLE_RATE", 0.1)?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            shopify,
            tryon,
            sentry_dsn: optional("SENTRY_DSN"),
            sentry_environment: optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// The socket address to bind.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_owned()))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_rate(name: &str, default: f32) -> Result<f32, ConfigError> {
    optional(name).map_or(Ok(default), |raw| {
        raw.parse::<f32>()
            .ok()
            .filter(|rate| (0.0..=1.0).contains(rate))
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(name.to_owned(), "must be a number in 0.0-1.0".to_owned())
            })
    })
}

/// Load a secret and reject obvious placeholder values.
fn validated_secret(name: &str) -> Result<SecretString, ConfigError> {
    let value = required(name)?;
    check_not_placeholder(name, &value)?;
    Ok(SecretString::from(value))
}

fn check_not_placeholder(name: &str, value: &str) -> Result<(), ConfigError> {
    let lowered = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lowered.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                name.to_owned(),
                format!("value looks like a placeholder (contains {pattern:?})"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_secrets_are_rejected() {
        for value in ["your-secret-here", "CHANGEME", "example-key", "todo"] {
            assert!(
                check_not_placeholder("TEST", value).is_err(),
                "{value:?} should be rejected"
            );
        }
    }

    #[test]
    fn real_looking_secrets_pass() {
        assert!(check_not_placeholder("TEST", "shpss_9f8e7d6c5b4a").is_ok());
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = ShopifyAppConfig {
            api_key: "key".to_owned(),
            api_secret: SecretString::from("shpss_secret"),
            scopes: String::new(),
            api_version: "2026-01".to_owned(),
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("shpss_secret"));
    }
}
