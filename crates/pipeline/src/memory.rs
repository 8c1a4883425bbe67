//! In-process [`BatchInserter`] used when no database is configured and by
//! tests that need to steer an import run.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use painel_core::row::ImportedRow;
use painel_core::types::DbId;

use crate::sink::{BatchInserter, SinkError};

type InsertHook = Box<dyn Fn(usize) + Send + Sync>;

/// Stores rows in a map keyed by sequential IDs starting at 1.
pub struct MemorySink {
    items: Mutex<BTreeMap<DbId, ImportedRow>>,
    next_id: AtomicI64,
    inserts: AtomicUsize,
    delete_calls: Mutex<Vec<Vec<DbId>>>,
    delay: Option<Duration>,
    fail_on_title: Option<String>,
    fail_deletes: bool,
    on_insert: Option<InsertHook>,
}

impl std::fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySink")
            .field("len", &self.len())
            .field("inserts", &self.insert_count())
            .field("delay", &self.delay)
            .field("fail_on_title", &self.fail_on_title)
            .field("fail_deletes", &self.fail_deletes)
            .finish_non_exhaustive()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            inserts: AtomicUsize::new(0),
            delete_calls: Mutex::new(Vec::new()),
            delay: None,
            fail_on_title: None,
            fail_deletes: false,
            on_insert: None,
        }
    }

    /// Sleep this long before each insert.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Reject any row whose title equals `title`.
    pub fn fail_on_title(mut self, title: impl Into<String>) -> Self {
        self.fail_on_title = Some(title.into());
        self
    }

    /// Make every `delete_many` call fail.
    pub fn fail_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    /// Call `hook` after each successful insert with the running insert count.
    pub fn on_insert(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_insert = Some(Box::new(hook));
        self
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Successful inserts over the sink's lifetime, deletes notwithstanding.
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Titles of stored rows in ID order.
    pub fn titles(&self) -> Vec<String> {
        lock(&self.items).values().map(|r| r.title.clone()).collect()
    }

    pub fn get(&self, id: DbId) -> Option<ImportedRow> {
        lock(&self.items).get(&id).cloned()
    }

    /// Arguments of every `delete_many` call, including failed ones.
    pub fn delete_calls(&self) -> Vec<Vec<DbId>> {
        lock(&self.delete_calls).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl BatchInserter for MemorySink {
    async fn insert_one(&self, row: &ImportedRow) -> Result<DbId, SinkError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on_title.as_deref() == Some(row.title.as_str()) {
            return Err(SinkError::Rejected {
                title: row.title.clone(),
                reason: "rejected by sink".into(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.items).insert(id, row.clone());
        let count = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(hook) = &self.on_insert {
            hook(count);
        }
        Ok(id)
    }

    async fn delete_many(&self, ids: &[DbId]) -> Result<(), SinkError> {
        lock(&self.delete_calls).push(ids.to_vec());
        if self.fail_deletes {
            return Err(SinkError::Storage("delete is unavailable".into()));
        }
        let mut items = lock(&self.items);
        for id in ids {
            items.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelFlag;
    use painel_core::progress::ImportProgress;

    #[tokio::test]
    async fn assigns_sequential_ids() {
        let sink = MemorySink::new();
        let a = sink.insert_one(&ImportedRow::titled("A")).await.unwrap();
        let b = sink.insert_one(&ImportedRow::titled("B")).await.unwrap();
        assert_eq!((a, b), (1, 2));
        assert_eq!(sink.get(2).unwrap().title, "B");
    }

    #[tokio::test]
    async fn default_batch_reports_progress_per_row() {
        let sink = MemorySink::new();
        let rows: Vec<_> = ["A", "B", "C"].into_iter().map(ImportedRow::titled).collect();
        let seen = Mutex::new(Vec::new());
        let report = |p: ImportProgress| lock(&seen).push(p.current);

        let ids = sink
            .insert_batch(&rows, &report, &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(*lock(&seen), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn failure_keeps_ids_inserted_before_it() {
        let sink = MemorySink::new().fail_on_title("B");
        let rows: Vec<_> = ["A", "B", "C"].into_iter().map(ImportedRow::titled).collect();

        let failure = sink
            .insert_batch(&rows, &|_: ImportProgress| {}, &CancelFlag::new())
            .await
            .unwrap_err();

        assert_eq!(failure.inserted, vec![1]);
        assert!(failure.to_string().contains("'B'"));
    }

    #[tokio::test]
    async fn set_flag_stops_before_first_row() {
        let sink = MemorySink::new();
        let flag = CancelFlag::new();
        flag.cancel();

        let ids = sink
            .insert_batch(&[ImportedRow::titled("A")], &|_: ImportProgress| {}, &flag)
            .await
            .unwrap();

        assert!(ids.is_empty());
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn delete_many_removes_rows() {
        let sink = MemorySink::new();
        for title in ["A", "B", "C"] {
            sink.insert_one(&ImportedRow::titled(title)).await.unwrap();
        }
        sink.delete_many(&[1, 3]).await.unwrap();
        assert_eq!(sink.titles(), vec!["B".to_string()]);
        assert_eq!(sink.delete_calls(), vec![vec![1, 3]]);
    }
}
