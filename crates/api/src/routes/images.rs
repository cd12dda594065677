//! User try-on photo routes.
//!
//! The widget uploads photos to blob storage itself; these routes only
//! record the metadata. Listing degrades to empty results when the database
//! is unreachable - the widget can still render, it just re-prompts for a
//! photo.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use vestia_core::ImageKind;

use crate::db::{NewUserImage, UserImage, UserImageRepository};
use crate::error::{AppError, Result};
use crate::middleware::ShopSession;
use crate::state::AppState;

/// Build the images router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/images", post(save))
        .route("/images", get(list))
}

#[derive(Debug, Deserialize)]
pub struct SaveImageRequest {
    pub user_id: String,
    pub shopify_customer_id: Option<String>,
    pub image_type: ImageKind,
    pub image_url: String,
    pub blob_filename: String,
}

#[derive(Debug, Deserialize)]
pub struct ListImagesParams {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    pub images: Vec<UserImage>,
}

/// POST /images - record an uploaded photo, replacing any prior photo of
/// the same kind.
#[instrument(skip(state, auth, req), fields(shop = %auth.shop))]
async fn save(
    State(state): State<AppState>,
    auth: ShopSession,
    Json(req): Json<SaveImageRequest>,
) -> Result<Json<UserImage>> {
    if req.user_id.trim().is_empty() {
        return Err(AppError::Validation("user_id cannot be empty".to_owned()));
    }
    if req.image_url.trim().is_empty() {
        return Err(AppError::Validation("image_url cannot be empty".to_owned()));
    }

    let image = UserImageRepository::new(state.pool())
        .upsert(&NewUserImage {
            user_id: req.user_id,
            shopify_customer_id: req.shopify_customer_id,
            kind: req.image_type,
            image_url: req.image_url,
            blob_filename: req.blob_filename,
        })
        .await?;

    Ok(Json(image))
}

/// GET /images?user_id= - the user's stored photos.
#[instrument(skip(state, auth, params), fields(shop = %auth.shop))]
async fn list(
    State(state): State<AppState>,
    auth: ShopSession,
    Query(params): Query<ListImagesParams>,
) -> Result<Json<ImagesResponse>> {
    let user_id = params
        .user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::Validation("missing user_id parameter".to_owned()))?;

    let images = match UserImageRepository::new(state.pool())
        .list_for_user(&user_id)
        .await
    {
        Ok(images) => images,
        // Degrade to an empty wardrobe when the database is unreachable;
        // anything else (bad data, query bugs) still fails the request.
        Err(err) if err.is_connectivity() => {
            tracing::warn!(error = %err, "Database unreachable, returning no images");
            Vec::new()
        }
        Err(err) => return Err(err.into()),
    };

    Ok(Json(ImagesResponse { images }))
}
