//! Repository for the `media_items` table.

use painel_core::types::DbId;
use sqlx::PgPool;

use crate::models::media_item::{CreateMediaItem, MediaItem};

/// Column list shared across queries.
const COLUMNS: &str = "id, collection, title, status, rating, platform, genres, \
    author, isbn, synopsis, extra, created_at, updated_at";

/// Provides CRUD operations for media items.
pub struct MediaItemRepo;

impl MediaItemRepo {
    /// Insert a new media item, returning the created row.
    pub async fn create(pool: &PgPool, body: &CreateMediaItem) -> Result<MediaItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO media_items \
                (collection, title, status, rating, platform, genres, \
                 author, isbn, synopsis, extra) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MediaItem>(&query)
            .bind(body.collection.as_str())
            .bind(&body.title)
            .bind(&body.status)
            .bind(body.rating)
            .bind(&body.platform)
            .bind(&body.genres)
            .bind(&body.author)
            .bind(&body.isbn)
            .bind(&body.synopsis)
            .bind(&body.extra)
            .fetch_one(pool)
            .await
    }

    /// Delete every item whose ID is in `ids`. Returns the number removed.
    pub async fn delete_many(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM media_items WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
