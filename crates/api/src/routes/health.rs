use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::{AppState, ImportBackend};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    backend: &'static str,
    db_healthy: Option<bool>,
    open_sessions: usize,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = match &state.backend {
        ImportBackend::Postgres(pool) => Some(painel_db::health_check(pool).await.is_ok()),
        ImportBackend::Memory(_) => None,
    };

    Json(HealthResponse {
        status: if db_healthy == Some(false) { "degraded" } else { "ok" },
        version: env!("CARGO_PKG_VERSION"),
        backend: state.backend.name(),
        db_healthy,
        open_sessions: state.registry.len().await,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
