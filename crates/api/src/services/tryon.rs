//! Image-generation API client for virtual try-on.
//!
//! The model itself is an external collaborator consumed only through its
//! documented HTTP interface: one `generations` endpoint that takes a person
//! photo and a garment photo and returns a composited image URL. Failures
//! are normalized into [`UpstreamError`] at this boundary, same as Shopify
//! calls.

use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::TryOnConfig;
use crate::shopify::UpstreamError;

/// Request body for the generations endpoint.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    person_image_url: &'a str,
    garment_image_url: &'a str,
    category: &'a str,
}

/// A successful generation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratedImage {
    /// URL of the composited try-on image.
    pub image_url: String,
    /// Provider-side generation id, useful for support lookups.
    pub id: Option<String>,
}

/// Error envelope the provider returns on non-success statuses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    code: Option<String>,
}

/// Client for the try-on image-generation API.
#[derive(Clone)]
pub struct TryOnClient {
    inner: Arc<TryOnClientInner>,
}

struct TryOnClientInner {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl TryOnClient {
    /// Create a new try-on client.
    ///
    /// # Panics
    ///
    /// Panics if the API key contains invalid header characters.
    #[must_use]
    pub fn new(config: &TryOnConfig) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
                .expect("Invalid API key for header"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            inner: Arc::new(TryOnClientInner {
                client,
                endpoint: config.endpoint.clone(),
                model: config.model.clone(),
            }),
        }
    }

    /// Generate a try-on image.
    ///
    /// `category` hints the garment placement (`tops`, `bottoms`,
    /// `one-pieces`); `auto` lets the model decide.
    ///
    /// # Errors
    ///
    /// Returns a normalized [`UpstreamError`] on transport failure or a
    /// non-success response.
    #[instrument(skip(self, person_image_url, garment_image_url), fields(model = %self.inner.model))]
    pub async fn generate(
        &self,
        person_image_url: &str,
        garment_image_url: &str,
        category: &str,
    ) -> Result<GeneratedImage, UpstreamError> {
        let request = GenerateRequest {
            model: &self.inner.model,
            person_image_url,
            garment_image_url,
            category,
        };

        let response = self
            .inner
            .client
            .post(format!("{}/generations", self.inner.endpoint))
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(UpstreamError::rate_limited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            // Prefer the provider's structured message when it sent one.
            if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body)
                && let Some(err) = envelope.error
            {
                let mut normalized = UpstreamError::from_status(status.as_u16(), &err.message);
                normalized.code = err.code;
                return Err(normalized);
            }
            return Err(UpstreamError::from_status(status.as_u16(), &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| UpstreamError::other(format!("invalid generation response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_response_deserializes() {
        let json = r#"{"image_url": "https://cdn.example/tryon/1.png", "id": "gen_123"}"#;
        let image: GeneratedImage = serde_json::from_str(json).expect("deserialize");
        assert_eq!(image.image_url, "https://cdn.example/tryon/1.png");
        assert_eq!(image.id.as_deref(), Some("gen_123"));
    }

    #[test]
    fn error_envelope_deserializes() {
        let json = r#"{"error": {"message": "unsupported garment", "code": "bad_input"}}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(json).expect("deserialize");
        let error = envelope.error.expect("error body");
        assert_eq!(error.code.as_deref(), Some("bad_input"));
        assert_eq!(error.message, "unsupported garment");
    }
}
