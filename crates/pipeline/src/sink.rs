//! The persistence capability the batch importer is parameterised over.
//!
//! The importer knows nothing about tables or clients. It hands rows to a
//! [`BatchInserter`], which commits them one by one and can optionally
//! delete what it created.

use async_trait::async_trait;
use painel_core::progress::ImportProgress;
use painel_core::row::ImportedRow;
use painel_core::types::DbId;

use crate::cancel::CancelFlag;

/// Failure of a single insert or delete.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Row '{title}' was rejected: {reason}")]
    Rejected { title: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Import run aborted: {0}")]
    Aborted(String),
}

/// An insert run that stopped on an error.
///
/// `inserted` holds the IDs committed before the failing row.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct BatchFailure {
    pub inserted: Vec<DbId>,
    #[source]
    pub error: SinkError,
}

#[async_trait]
pub trait BatchInserter: Send + Sync {
    /// Persist one row and return its new ID.
    async fn insert_one(&self, row: &ImportedRow) -> Result<DbId, SinkError>;

    /// Persist `rows` in order.
    ///
    /// The cancel flag is checked before each row, never mid-row, and
    /// `on_progress` is called after each committed row with the count
    /// committed in this call. Returns the IDs created so far when the flag
    /// stops the loop.
    async fn insert_batch(
        &self,
        rows: &[ImportedRow],
        on_progress: &(dyn Fn(ImportProgress) + Send + Sync),
        cancel: &CancelFlag,
    ) -> Result<Vec<DbId>, BatchFailure> {
        let total = rows.len();
        let mut inserted = Vec::with_capacity(total);

        for row in rows {
            if cancel.is_cancelled() {
                break;
            }
            match self.insert_one(row).await {
                Ok(id) => {
                    inserted.push(id);
                    on_progress(ImportProgress::new(inserted.len(), total));
                }
                Err(error) => return Err(BatchFailure { inserted, error }),
            }
        }

        Ok(inserted)
    }

    /// Delete previously inserted rows. Sinks without delete support keep
    /// this no-op.
    async fn delete_many(&self, ids: &[DbId]) -> Result<(), SinkError> {
        let _ = ids;
        Ok(())
    }
}
