//! Widget users' try-on photo metadata.
//!
//! The photos themselves live in blob storage; this table only records the
//! URL and filename per (user, kind). A user keeps at most one photo of each
//! kind - uploading a new one upserts over the previous row.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use vestia_core::ImageKind;

use super::RepositoryError;

// =============================================================================
// Types
// =============================================================================

/// A stored user photo record.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserImage {
    /// Widget-issued user id (anonymous visitors included).
    pub user_id: String,
    /// Shopify customer id, when the visitor is logged in.
    pub shopify_customer_id: Option<String>,
    pub kind: ImageKind,
    pub image_url: String,
    pub blob_filename: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for an insert/upsert.
#[derive(Debug, Clone)]
pub struct NewUserImage {
    pub user_id: String,
    pub shopify_customer_id: Option<String>,
    pub kind: ImageKind,
    pub image_url: String,
    pub blob_filename: String,
}

/// Internal row type for `PostgreSQL` queries.
#[derive(Debug, sqlx::FromRow)]
struct UserImageRow {
    user_id: String,
    shopify_customer_id: Option<String>,
    image_type: String,
    image_url: String,
    blob_filename: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserImageRow> for UserImage {
    type Error = RepositoryError;

    fn try_from(row: UserImageRow) -> Result<Self, Self::Error> {
        let kind = row
            .image_type
            .parse::<ImageKind>()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Self {
            user_id: row.user_id,
            shopify_customer_id: row.shopify_customer_id,
            kind,
            image_url: row.image_url,
            blob_filename: row.blob_filename,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user image database operations.
pub struct UserImageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserImageRepository<'a> {
    /// Create a new user image repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace the user's photo of this kind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, new: &NewUserImage) -> Result<UserImage, RepositoryError> {
        let row: UserImageRow = sqlx::query_as(
            r"
            INSERT INTO user_images
                (user_id, shopify_customer_id, image_type, image_url, blob_filename)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, image_type) DO UPDATE SET
                shopify_customer_id = EXCLUDED.shopify_customer_id,
                image_url = EXCLUDED.image_url,
                blob_filename = EXCLUDED.blob_filename,
                updated_at = (CURRENT_TIMESTAMP AT TIME ZONE 'utc')
            RETURNING user_id, shopify_customer_id, image_type, image_url,
                      blob_filename, created_at, updated_at
            ",
        )
        .bind(&new.user_id)
        .bind(&new.shopify_customer_id)
        .bind(new.kind.as_str())
        .bind(&new.image_url)
        .bind(&new.blob_filename)
        .fetch_one(self.pool)
        .await?;

        UserImage::try_from(row)
    }

    /// All photos for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<UserImage>, RepositoryError> {
        let rows: Vec<UserImageRow> = sqlx::query_as(
            r"
            SELECT user_id, shopify_customer_id, image_type, image_url,
                   blob_filename, created_at, updated_at
            FROM user_images
            WHERE user_id = $1
            ORDER BY updated_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(UserImage::try_from).collect()
    }

    /// The user's photo of one kind, if stored.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: &str,
        kind: ImageKind,
    ) -> Result<Option<UserImage>, RepositoryError> {
        let row: Option<UserImageRow> = sqlx::query_as(
            r"
            SELECT user_id, shopify_customer_id, image_type, image_url,
                   blob_filename, created_at, updated_at
            FROM user_images
            WHERE user_id = $1 AND image_type = $2
            ",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(UserImage::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_conversion_rejects_unknown_kinds() {
        let row = UserImageRow {
            user_id: "u1".to_owned(),
            shopify_customer_id: None,
            image_type: "selfie".to_owned(),
            image_url: "https://cdn.example/u1.png".to_owned(),
            blob_filename: "u1.png".to_owned(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(matches!(
            UserImage::try_from(row),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
