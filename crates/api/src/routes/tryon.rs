//! Virtual try-on generation route.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use vestia_core::ImageKind;

use crate::db::{NewUserImage, UserImageRepository};
use crate::error::{AppError, Result};
use crate::middleware::ShopSession;
use crate::retry::call_upstream;
use crate::services::tryon::GeneratedImage;
use crate::state::AppState;

/// Build the try-on router.
pub fn router() -> Router<AppState> {
    Router::new().route("/tryon", post(generate))
}

#[derive(Debug, Deserialize)]
pub struct TryOnRequest {
    pub user_id: String,
    /// Product photo to composite onto the person.
    pub garment_image_url: String,
    /// Person photo; falls back to the user's stored photo when omitted.
    pub person_image_url: Option<String>,
    /// Which stored photo to fall back to (default: full body).
    #[serde(default)]
    pub image_type: ImageKind,
    /// Garment placement hint (`tops`, `bottoms`, `one-pieces`, `auto`).
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TryOnResponse {
    pub image: GeneratedImage,
}

/// POST /tryon - composite a garment onto the user's photo.
#[instrument(skip(state, auth, req), fields(shop = %auth.shop))]
async fn generate(
    State(state): State<AppState>,
    auth: ShopSession,
    Json(req): Json<TryOnRequest>,
) -> Result<Json<TryOnResponse>> {
    if req.user_id.trim().is_empty() {
        return Err(AppError::Validation("user_id cannot be empty".to_owned()));
    }
    if req.garment_image_url.trim().is_empty() {
        return Err(AppError::Validation(
            "garment_image_url cannot be empty".to_owned(),
        ));
    }

    let repo = UserImageRepository::new(state.pool());

    let person_image_url = match req.person_image_url.filter(|u| !u.trim().is_empty()) {
        Some(url) => {
            // A freshly supplied photo becomes the user's stored photo of
            // this kind. Best-effort: a failed save never blocks the try-on.
            let save = repo
                .upsert(&NewUserImage {
                    user_id: req.user_id.clone(),
                    shopify_customer_id: None,
                    kind: req.image_type,
                    image_url: url.clone(),
                    blob_filename: filename_from_url(&url),
                })
                .await;
            if let Err(err) = save {
                tracing::warn!(error = %err, "Failed to save person image, continuing");
            }
            url
        }
        None => repo
            .get(&req.user_id, req.image_type)
            .await?
            .map(|image| image.image_url)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "no stored {} photo; upload one first",
                    req.image_type
                ))
            })?,
    };

    let client = state.tryon().clone();
    let garment = req.garment_image_url.clone();
    let category = req.category.unwrap_or_else(|| "auto".to_owned());

    let image = call_upstream(move || {
        let client = client.clone();
        let person = person_image_url.clone();
        let garment = garment.clone();
        let category = category.clone();
        async move { client.generate(&person, &garment, &category).await }
    })
    .await?;

    Ok(Json(TryOnResponse { image }))
}

/// Last path segment of a URL, for the blob filename column.
fn filename_from_url(url: &str) -> String {
    url.rsplit('/')
        .next()
        .map(|segment| segment.split('?').next().unwrap_or(segment))
        .filter(|s| !s.is_empty())
        .unwrap_or("upload")
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_come_from_the_last_path_segment() {
        assert_eq!(
            filename_from_url("https://cdn.example/u/abc.png?sig=1"),
            "abc.png"
        );
        assert_eq!(filename_from_url("https://cdn.example/"), "upload");
        assert_eq!(filename_from_url(""), "upload");
    }
}
