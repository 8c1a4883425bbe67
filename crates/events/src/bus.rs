//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` between the import sessions
//! that publish and the HTTP streams that forward events to the browser.

use chrono::{DateTime, Utc};
use painel_core::progress::{ImportProgress, ImportSummary};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ImportEvent
// ---------------------------------------------------------------------------

/// What happened to an import session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportEventKind {
    /// A run began; `total` is the size of the whole selection.
    Started { start_from: usize, total: usize },
    /// One more row was committed (session-wide numbers).
    Progress(ImportProgress),
    /// A cancellation request was honoured at a row boundary.
    Paused { committed: usize, total: usize },
    /// The session reached its terminal state.
    Completed(ImportSummary),
    /// The operator left the flow; all session state was dropped.
    Closed,
}

/// An event tagged with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportEvent {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub kind: ImportEventKind,
    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl ImportEvent {
    pub fn new(session_id: Uuid, kind: ImportEventKind) -> Self {
        Self {
            session_id,
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Dot-separated name used as the SSE event name.
    pub fn event_type(&self) -> &'static str {
        match self.kind {
            ImportEventKind::Started { .. } => "import.started",
            ImportEventKind::Progress(_) => "import.progress",
            ImportEventKind::Paused { .. } => "import.paused",
            ImportEventKind::Completed(_) => "import.completed",
            ImportEventKind::Closed => "import.closed",
        }
    }

    /// Whether no further events will follow for this session.
    ///
    /// A completed session can still be replaced by a new file in the same
    /// flow, so only `Closed` ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, ImportEventKind::Closed)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use painel_events::bus::{EventBus, ImportEvent, ImportEventKind};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(ImportEvent::new(uuid::Uuid::new_v4(), ImportEventKind::Closed));
/// ```
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<ImportEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed messages are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: ImportEvent) {
        tracing::trace!(
            session_id = %event.session_id,
            event_type = event.event_type(),
            "Publishing import event",
        );
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
