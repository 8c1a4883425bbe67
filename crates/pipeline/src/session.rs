//! Import session: the resumable batch commit state machine.
//!
//! ```text
//! Idle ──commit──▶ Running ──flag seen──▶ Paused ──resume──▶ Running
//!                     │                     │
//!                     └──done / error──▶ Completed ◀──keep / discard──┘
//! ```
//!
//! A run can be driven in one call with [`ImportSession::commit`], or split
//! into [`ImportSession::begin_run`], [`RunPlan::execute`] and
//! [`ImportSession::finish_run`] so the insert loop can run on its own task
//! while the session stays reachable for cancel requests and snapshots.

use std::sync::Arc;

use painel_core::progress::{ImportProgress, ImportSummary};
use painel_core::row::ImportedRow;
use painel_core::types::DbId;
use painel_events::{EventBus, ImportEvent, ImportEventKind};
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::cancel::CancelFlag;
use crate::sink::{BatchFailure, BatchInserter};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Where an import session stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// Confirmed, nothing committed yet.
    Idle,
    /// A run is in flight. `start_from` rows were committed by earlier runs.
    Running {
        start_from: usize,
        inserted_ids: Vec<DbId>,
    },
    /// A cancellation was honoured; `committed` rows are persisted.
    Paused {
        committed: usize,
        inserted_ids: Vec<DbId>,
    },
    /// Terminal.
    Completed(ImportSummary),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running { .. } => "running",
            Self::Paused { .. } => "paused",
            Self::Completed(_) => "completed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Cannot {action} an import session that is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("No rows selected for import")]
    EmptySelection,

    #[error("Run {run_id} no longer belongs to this session")]
    StaleRun { run_id: u64 },
}

/// Serializable view of a session for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    /// Size of the original selection. The completed state carries its own
    /// `total`, so this one is named apart.
    pub selected_count: usize,
    pub progress: Option<ImportProgress>,
    pub cancel_requested: bool,
    #[serde(flatten)]
    pub state: SessionState,
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Maps per-run progress onto the session frame and fans it out.
#[derive(Debug, Clone)]
struct ProgressReporter {
    session_id: Uuid,
    start_from: usize,
    total: usize,
    latest: Arc<watch::Sender<Option<ImportProgress>>>,
    events: Option<Arc<EventBus>>,
}

impl ProgressReporter {
    fn report(&self, run_progress: ImportProgress) {
        let progress = run_progress.offset(self.start_from, self.total);
        tracing::debug!(
            session_id = %self.session_id,
            current = progress.current,
            total = progress.total,
            percent = progress.percent,
            "Import progress",
        );
        self.latest.send_replace(Some(progress));
        if let Some(bus) = &self.events {
            bus.publish(ImportEvent::new(
                self.session_id,
                ImportEventKind::Progress(progress),
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// RunPlan
// ---------------------------------------------------------------------------

/// Everything one run needs, detached from the session borrow.
#[derive(Debug)]
pub struct RunPlan {
    run_id: u64,
    rows: Vec<ImportedRow>,
    cancel: CancelFlag,
    reporter: ProgressReporter,
}

impl RunPlan {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Rows this run will try to commit (the uncommitted tail).
    pub fn rows(&self) -> &[ImportedRow] {
        &self.rows
    }

    /// Commit the rows through `sink`, reporting session-wide progress.
    pub async fn execute(&self, sink: &dyn BatchInserter) -> Result<Vec<DbId>, BatchFailure> {
        let report = |progress: ImportProgress| self.reporter.report(progress);
        sink.insert_batch(&self.rows, &report, &self.cancel).await
    }
}

// ---------------------------------------------------------------------------
// ImportSession
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ImportSession {
    id: Uuid,
    rows: Vec<ImportedRow>,
    state: SessionState,
    cancel: CancelFlag,
    run_id: u64,
    progress: Arc<watch::Sender<Option<ImportProgress>>>,
    events: Option<Arc<EventBus>>,
}

impl ImportSession {
    /// Create an idle session over the operator's selected rows.
    pub fn new(id: Uuid, rows: Vec<ImportedRow>) -> Self {
        let (progress, _) = watch::channel(None);
        Self {
            id,
            rows,
            state: SessionState::Idle,
            cancel: CancelFlag::new(),
            run_id: 0,
            progress: Arc::new(progress),
            events: None,
        }
    }

    /// Publish lifecycle and progress events on `bus`.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Size of the original selection.
    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Running { .. })
    }

    /// Latest session-wide progress, if a run has started.
    pub fn progress(&self) -> Option<ImportProgress> {
        *self.progress.borrow()
    }

    /// Handle that cancels whichever run is in flight.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            selected_count: self.total(),
            progress: self.progress(),
            cancel_requested: self.cancel.is_cancelled(),
            state: self.state.clone(),
        }
    }

    // -- transitions --

    /// Move to `Running` and hand out the plan for the uncommitted tail.
    ///
    /// Valid from `Idle` (first run) and `Paused` (resume). Resuming with
    /// nothing left to commit completes the session directly and returns
    /// `None`.
    pub fn begin_run(&mut self) -> Result<Option<RunPlan>, SessionError> {
        let total = self.total();
        let (start_from, inserted_ids) = match &self.state {
            SessionState::Idle if total == 0 => return Err(SessionError::EmptySelection),
            SessionState::Idle => (0, Vec::new()),
            SessionState::Paused { committed, .. } if *committed >= total => {
                let committed = *committed;
                tracing::info!(
                    session_id = %self.id,
                    committed,
                    "Nothing left to resume, completing import",
                );
                self.complete(ImportSummary {
                    imported_count: committed,
                    total,
                    partial: false,
                    error: None,
                });
                return Ok(None);
            }
            SessionState::Paused {
                committed,
                inserted_ids,
            } => (*committed, inserted_ids.clone()),
            other => {
                return Err(SessionError::InvalidTransition {
                    action: "start a run on",
                    state: other.name(),
                })
            }
        };

        self.cancel.reset();
        self.run_id += 1;
        self.state = SessionState::Running {
            start_from,
            inserted_ids,
        };
        self.progress
            .send_replace(Some(ImportProgress::new(start_from, total)));
        self.publish(ImportEventKind::Started { start_from, total });
        tracing::info!(
            session_id = %self.id,
            run_id = self.run_id,
            start_from,
            total,
            "Import run started",
        );

        Ok(Some(RunPlan {
            run_id: self.run_id,
            rows: self.rows[start_from..].to_vec(),
            cancel: self.cancel.clone(),
            reporter: ProgressReporter {
                session_id: self.id,
                start_from,
                total,
                latest: Arc::clone(&self.progress),
                events: self.events.clone(),
            },
        }))
    }

    /// Apply the outcome of the run identified by `run_id`.
    ///
    /// A set cancel flag moves the session to `Paused`; otherwise it
    /// completes. An insert failure completes it with the error message and
    /// no retry.
    pub fn finish_run(
        &mut self,
        run_id: u64,
        outcome: Result<Vec<DbId>, BatchFailure>,
    ) -> Result<&SessionState, SessionError> {
        let (start_from, mut inserted_ids) =
            match std::mem::replace(&mut self.state, SessionState::Idle) {
                SessionState::Running {
                    start_from,
                    inserted_ids,
                } if run_id == self.run_id => (start_from, inserted_ids),
                other => {
                    self.state = other;
                    tracing::warn!(
                        session_id = %self.id,
                        run_id,
                        "Discarding outcome of a run the session no longer tracks",
                    );
                    return Err(SessionError::StaleRun { run_id });
                }
            };
        let total = self.total();

        match outcome {
            Ok(ids) => {
                let committed = start_from + ids.len();
                inserted_ids.extend(ids);

                if self.cancel.is_cancelled() {
                    tracing::info!(
                        session_id = %self.id,
                        committed,
                        total,
                        "Import paused at row boundary",
                    );
                    self.progress
                        .send_replace(Some(ImportProgress::new(committed, total)));
                    self.state = SessionState::Paused {
                        committed,
                        inserted_ids,
                    };
                    self.publish(ImportEventKind::Paused { committed, total });
                } else {
                    self.complete(ImportSummary {
                        imported_count: total,
                        total,
                        partial: false,
                        error: None,
                    });
                }
            }
            Err(failure) => {
                let committed = start_from + failure.inserted.len();
                tracing::error!(
                    session_id = %self.id,
                    committed,
                    total,
                    error = %failure.error,
                    "Import run failed",
                );
                self.complete(ImportSummary {
                    imported_count: committed,
                    total,
                    partial: committed < total,
                    error: Some(failure.error.to_string()),
                });
            }
        }

        Ok(&self.state)
    }

    /// Run (or resume) a batch to its next resting state.
    pub async fn commit(&mut self, sink: &dyn BatchInserter) -> Result<&SessionState, SessionError> {
        let Some(plan) = self.begin_run()? else {
            return Ok(&self.state);
        };
        let outcome = plan.execute(sink).await;
        self.finish_run(plan.run_id, outcome)
    }

    /// Continue a paused batch with its uncommitted tail.
    pub async fn resume(&mut self, sink: &dyn BatchInserter) -> Result<&SessionState, SessionError> {
        self.expect_paused("resume")?;
        self.commit(sink).await
    }

    /// Ask the in-flight run to stop at the next row boundary.
    ///
    /// Returns `false` when no run is in flight.
    pub fn request_cancel(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        tracing::info!(session_id = %self.id, "Import cancellation requested");
        self.cancel.cancel();
        true
    }

    /// Accept the rows committed before the pause as final.
    pub fn keep_imported(&mut self) -> Result<&SessionState, SessionError> {
        let committed = self.expect_paused("keep rows of")?;
        self.complete(ImportSummary {
            imported_count: committed,
            total: self.total(),
            partial: true,
            error: None,
        });
        Ok(&self.state)
    }

    /// Delete every row inserted by this session, then complete it.
    ///
    /// A failed delete is logged and the session still completes.
    pub async fn discard_all(
        &mut self,
        sink: &dyn BatchInserter,
    ) -> Result<&SessionState, SessionError> {
        self.expect_paused("discard rows of")?;
        let inserted_ids = match &self.state {
            SessionState::Paused { inserted_ids, .. } => inserted_ids.clone(),
            _ => Vec::new(),
        };

        if let Err(e) = sink.delete_many(&inserted_ids).await {
            tracing::warn!(
                session_id = %self.id,
                count = inserted_ids.len(),
                error = %e,
                "Failed to discard imported rows",
            );
        } else {
            tracing::info!(
                session_id = %self.id,
                count = inserted_ids.len(),
                "Discarded imported rows",
            );
        }

        self.complete(ImportSummary {
            imported_count: 0,
            total: self.total(),
            partial: true,
            error: None,
        });
        Ok(&self.state)
    }

    /// Drop all progress and return to `Idle`.
    ///
    /// An in-flight run is told to stop and its outcome is ignored.
    pub fn reset(&mut self) {
        self.cancel.cancel();
        self.cancel = CancelFlag::new();
        self.run_id += 1;
        self.state = SessionState::Idle;
        self.progress.send_replace(None);
        self.publish(ImportEventKind::Closed);
    }

    // -- helpers --

    fn expect_paused(&self, action: &'static str) -> Result<usize, SessionError> {
        match &self.state {
            SessionState::Paused { committed, .. } => Ok(*committed),
            other => Err(SessionError::InvalidTransition {
                action,
                state: other.name(),
            }),
        }
    }

    fn complete(&mut self, summary: ImportSummary) {
        tracing::info!(
            session_id = %self.id,
            imported = summary.imported_count,
            total = summary.total,
            left_out = summary.left_out(),
            partial = summary.partial,
            "Import session completed",
        );
        self.state = SessionState::Completed(summary.clone());
        self.publish(ImportEventKind::Completed(summary));
    }

    fn publish(&self, kind: ImportEventKind) {
        if let Some(bus) = &self.events {
            bus.publish(ImportEvent::new(self.id, kind));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
