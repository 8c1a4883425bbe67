//! Server-Sent Events stream of one import session's lifecycle and progress.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use painel_events::ImportEvent;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::error::AppResult;
use crate::state::AppState;

const KEEP_ALIVE: Duration = Duration::from_secs(15);

fn to_sse(event: &ImportEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event.event_type()).data(json)),
        Err(e) => {
            tracing::warn!(event_type = event.event_type(), error = %e, "Failed to serialize import event");
            None
        }
    }
}

/// GET /api/v1/imports/{id}/events
///
/// Streams `import.started`, `import.progress`, `import.paused`,
/// `import.completed` and `import.closed` for the session. The stream ends
/// after `import.closed`.
pub async fn import_event_stream(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    state.registry.get(id).await?;
    let mut rx = state.event_bus.subscribe();
    tracing::debug!(
        session_id = %id,
        subscribers = state.event_bus.subscriber_count(),
        "SSE client subscribed to import events",
    );

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) if event.session_id == id => {
                    let terminal = event.is_terminal();
                    if let Some(sse) = to_sse(&event) {
                        yield Ok(sse);
                    }
                    if terminal {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(session_id = %id, skipped, "SSE client lagged behind import events");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!(session_id = %id, "SSE import event stream ended");
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE).text("heartbeat")))
}
