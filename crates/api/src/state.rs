use std::sync::Arc;

use painel_db::models::media_item::MediaCollection;
use painel_db::{DbPool, PgSink};
use painel_events::EventBus;
use painel_pipeline::{BatchInserter, MemorySink};

use crate::config::ServerConfig;
use crate::registry::SessionRegistry;

/// Where committed rows end up.
#[derive(Clone)]
pub enum ImportBackend {
    /// No database configured; rows live in process memory.
    Memory(Arc<MemorySink>),
    Postgres(DbPool),
}

impl ImportBackend {
    /// Sink that writes into `collection`.
    pub fn sink_for(&self, collection: MediaCollection) -> Arc<dyn BatchInserter> {
        match self {
            Self::Memory(sink) => Arc::clone(sink) as Arc<dyn BatchInserter>,
            Self::Postgres(pool) => Arc::new(PgSink::new(pool.clone(), collection)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }
}

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything heavy sits behind an `Arc` or a pool handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub backend: ImportBackend,
    /// Open import flows keyed by ID.
    pub registry: Arc<SessionRegistry>,
    /// Import lifecycle and progress events, fanned out to SSE clients.
    pub event_bus: Arc<EventBus>,
}
