//! Database-backed [`BatchInserter`].

use async_trait::async_trait;
use painel_core::row::ImportedRow;
use painel_core::types::DbId;
use painel_pipeline::{BatchInserter, SinkError};

use crate::models::media_item::{CreateMediaItem, MediaCollection};
use crate::repositories::MediaItemRepo;
use crate::DbPool;

/// Inserts imported rows into `media_items` for one collection.
#[derive(Debug, Clone)]
pub struct PgSink {
    pool: DbPool,
    collection: MediaCollection,
}

impl PgSink {
    pub fn new(pool: DbPool, collection: MediaCollection) -> Self {
        Self { pool, collection }
    }

    pub fn collection(&self) -> MediaCollection {
        self.collection
    }
}

#[async_trait]
impl BatchInserter for PgSink {
    async fn insert_one(&self, row: &ImportedRow) -> Result<DbId, SinkError> {
        let body = CreateMediaItem::from_imported(self.collection, row);
        let item = MediaItemRepo::create(&self.pool, &body)
            .await
            .map_err(|e| classify_insert_error(&row.title, e))?;
        tracing::debug!(id = item.id, collection = %self.collection, "Media item inserted");
        Ok(item.id)
    }

    async fn delete_many(&self, ids: &[DbId]) -> Result<(), SinkError> {
        let deleted = MediaItemRepo::delete_many(&self.pool, ids)
            .await
            .map_err(|e| SinkError::Storage(e.to_string()))?;
        tracing::info!(
            requested = ids.len(),
            deleted,
            collection = %self.collection,
            "Media items deleted",
        );
        Ok(())
    }
}

/// Constraint violations (SQLSTATE class 23) reject the row; everything
/// else is a storage failure.
fn classify_insert_error(title: &str, err: sqlx::Error) -> SinkError {
    match &err {
        sqlx::Error::Database(db_err)
            if db_err.code().is_some_and(|code| code.starts_with("23")) =>
        {
            SinkError::Rejected {
                title: title.to_string(),
                reason: db_err.message().to_string(),
            }
        }
        _ => SinkError::Storage(err.to_string()),
    }
}
