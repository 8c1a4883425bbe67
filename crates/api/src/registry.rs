//! In-memory registry of open import flows.
//!
//! Each flow sits behind its own async mutex so a long insert run never
//! blocks other sessions. Runs release the lock while rows are being
//! inserted and take it again only to record the outcome.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use painel_core::error::CoreError;
use painel_db::models::media_item::MediaCollection;
use painel_pipeline::ImportFlow;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard, RwLock};
use tokio::time::Instant;
use uuid::Uuid;

/// One open flow plus the collection its rows go to.
#[derive(Debug)]
pub struct SessionHandle {
    id: Uuid,
    collection: MediaCollection,
    flow: AsyncMutex<ImportFlow>,
    last_touched: Mutex<Instant>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn collection(&self) -> MediaCollection {
        self.collection
    }

    pub async fn lock(&self) -> MutexGuard<'_, ImportFlow> {
        self.touch();
        self.flow.lock().await
    }

    fn touch(&self) {
        *self.last_touched.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_touched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, flow: ImportFlow, collection: MediaCollection) -> Arc<SessionHandle> {
        let handle = Arc::new(SessionHandle {
            id: flow.id(),
            collection,
            flow: AsyncMutex::new(flow),
            last_touched: Mutex::new(Instant::now()),
        });
        self.sessions
            .write()
            .await
            .insert(handle.id, Arc::clone(&handle));
        handle
    }

    /// Look up a flow, refreshing its idle timer.
    pub async fn get(&self, id: Uuid) -> Result<Arc<SessionHandle>, CoreError> {
        let handle = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: "ImportSession",
                id: id.to_string(),
            })?;
        handle.touch();
        Ok(handle)
    }

    pub async fn remove(&self, id: Uuid) -> Option<Arc<SessionHandle>> {
        self.sessions.write().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Close and drop flows idle for longer than `ttl`.
    ///
    /// Flows that are locked or have a run in flight are left alone.
    /// Returns how many were removed.
    pub async fn reap_idle(&self, ttl: Duration) -> usize {
        let candidates: Vec<Arc<SessionHandle>> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|h| h.idle_for() > ttl)
            .cloned()
            .collect();

        let mut removed = 0;
        for handle in candidates {
            let Ok(mut flow) = handle.flow.try_lock() else {
                continue;
            };
            if flow.is_running() {
                continue;
            }
            flow.close();
            drop(flow);

            if self.sessions.write().await.remove(&handle.id).is_some() {
                tracing::info!(session_id = %handle.id, "Closed idle import session");
                removed += 1;
            }
        }
        removed
    }
}
