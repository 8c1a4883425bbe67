//! One operator's pass through the import dialog: pick a file, review and
//! select rows, then drive an [`ImportSession`] over the selection.

use std::sync::Arc;

use painel_core::error::CoreError;
use painel_core::ingest::ingest_bytes;
use painel_core::messages::Locale;
use painel_core::preview::Preview;
use painel_core::row::ImportResult;
use painel_events::EventBus;
use serde::Serialize;
use uuid::Uuid;

use crate::session::{ImportSession, SessionError, SessionSnapshot, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStage {
    SelectFile,
    Preview,
    Importing,
}

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("No file has been loaded")]
    NoFile,

    #[error("No rows selected for import")]
    EmptySelection,

    #[error("An import is in progress")]
    Busy,

    #[error("The import has not been confirmed")]
    NotConfirmed,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Serializable summary of a flow for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct FlowSnapshot {
    pub id: Uuid,
    pub stage: FlowStage,
    pub locale: Locale,
    pub filename: Option<String>,
    pub headers: Vec<String>,
    pub errors: Vec<String>,
    pub row_count: usize,
    pub selected_count: usize,
    pub all_selected: bool,
    pub page_count: usize,
    pub session: Option<SessionSnapshot>,
}

#[derive(Debug)]
pub struct ImportFlow {
    id: Uuid,
    locale: Locale,
    filename: Option<String>,
    preview: Option<Preview>,
    session: Option<ImportSession>,
    events: Option<Arc<EventBus>>,
}

impl ImportFlow {
    pub fn new(id: Uuid, locale: Locale) -> Self {
        Self {
            id,
            locale,
            filename: None,
            preview: None,
            session: None,
            events: None,
        }
    }

    /// Sessions created by this flow publish on `bus`.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn stage(&self) -> FlowStage {
        match (&self.preview, &self.session) {
            (_, Some(_)) => FlowStage::Importing,
            (Some(_), None) => FlowStage::Preview,
            (None, None) => FlowStage::SelectFile,
        }
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    /// Selection can only change before the import is confirmed.
    pub fn preview_mut(&mut self) -> Result<&mut Preview, FlowError> {
        if self.session.is_some() {
            return Err(FlowError::Busy);
        }
        self.preview.as_mut().ok_or(FlowError::NoFile)
    }

    pub fn session(&self) -> Option<&ImportSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Result<&mut ImportSession, FlowError> {
        self.session.as_mut().ok_or(FlowError::NotConfirmed)
    }

    pub fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(ImportSession::is_running)
    }

    /// A running or paused session still owes the operator a decision.
    pub fn is_unsettled(&self) -> bool {
        self.session.as_ref().is_some_and(|session| {
            matches!(
                session.state(),
                SessionState::Running { .. } | SessionState::Paused { .. }
            )
        })
    }

    /// Parse `bytes` and replace any previous result, selection and session.
    ///
    /// Refused with `Busy` while a session is running or paused.
    pub fn load_file(&mut self, filename: &str, bytes: &[u8]) -> Result<&ImportResult, FlowError> {
        if self.is_unsettled() {
            return Err(FlowError::Busy);
        }
        self.drop_session();

        let result = ingest_bytes(filename, bytes, self.locale);
        tracing::info!(
            flow_id = %self.id,
            filename,
            rows = result.rows.len(),
            warnings = result.errors.len(),
            "Import file parsed",
        );

        self.filename = Some(filename.to_string());
        let preview = self.preview.insert(Preview::new(result));
        Ok(preview.result())
    }

    /// Go back to file selection, forgetting the parsed result.
    pub fn clear_file(&mut self) -> Result<(), FlowError> {
        if self.is_unsettled() {
            return Err(FlowError::Busy);
        }
        self.drop_session();
        self.filename = None;
        self.preview = None;
        Ok(())
    }

    /// Start an import session over the selected rows, in file order.
    ///
    /// Each loaded file is confirmed at most once; `load_file` or
    /// `clear_file` reopens the flow after a completed session.
    pub fn confirm(&mut self) -> Result<&mut ImportSession, FlowError> {
        let preview = self.preview.as_ref().ok_or(FlowError::NoFile)?;
        if self.session.is_some() {
            return Err(FlowError::Busy);
        }
        if !preview.can_confirm() {
            return Err(FlowError::EmptySelection);
        }

        let rows = preview.selected_rows();
        tracing::info!(flow_id = %self.id, rows = rows.len(), "Import confirmed");

        let mut session = ImportSession::new(self.id, rows);
        if let Some(bus) = &self.events {
            session = session.with_events(Arc::clone(bus));
        }
        Ok(self.session.insert(session))
    }

    /// Leave the flow: stop any run and forget everything.
    pub fn close(&mut self) {
        tracing::info!(flow_id = %self.id, stage = ?self.stage(), "Import flow closed");
        self.drop_session();
        self.filename = None;
        self.preview = None;
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        let preview = self.preview.as_ref();
        let result = preview.map(Preview::result);
        FlowSnapshot {
            id: self.id,
            stage: self.stage(),
            locale: self.locale,
            filename: self.filename.clone(),
            headers: result.map(|r| r.headers.clone()).unwrap_or_default(),
            errors: result.map(|r| r.errors.clone()).unwrap_or_default(),
            row_count: preview.map_or(0, Preview::row_count),
            selected_count: preview.map_or(0, Preview::selected_count),
            all_selected: preview.is_some_and(Preview::all_selected),
            page_count: preview.map_or(0, Preview::page_count),
            session: self.session.as_ref().map(ImportSession::snapshot),
        }
    }

    fn drop_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySink;
    use assert_matches::assert_matches;
    use painel_core::row::ItemStatus;

    const BOOKS: &[u8] = b"Dune\nFoundation\nNeuromancer\n";

    fn loaded() -> ImportFlow {
        let mut flow = ImportFlow::new(Uuid::new_v4(), Locale::PtBr);
        flow.load_file("books.txt", BOOKS).unwrap();
        flow
    }

    #[test]
    fn starts_at_file_selection() {
        let flow = ImportFlow::new(Uuid::new_v4(), Locale::En);
        assert_eq!(flow.stage(), FlowStage::SelectFile);
        assert_matches!(
            ImportFlow::new(Uuid::new_v4(), Locale::En).confirm(),
            Err(FlowError::NoFile)
        );
    }

    #[test]
    fn loading_selects_every_row() {
        let flow = loaded();
        assert_eq!(flow.stage(), FlowStage::Preview);
        let preview = flow.preview().unwrap();
        assert_eq!(preview.row_count(), 3);
        assert!(preview.all_selected());
        assert!(preview
            .result()
            .rows
            .iter()
            .all(|r| r.status == ItemStatus::Pending));
    }

    #[test]
    fn confirm_uses_selected_rows_in_file_order() {
        let mut flow = loaded();
        flow.preview_mut().unwrap().toggle(1).unwrap();

        let session = flow.confirm().unwrap();
        assert_eq!(session.total(), 2);
        assert_eq!(flow.stage(), FlowStage::Importing);
        assert_matches!(flow.preview_mut(), Err(FlowError::Busy));
    }

    #[test]
    fn confirm_with_empty_selection_is_refused() {
        let mut flow = loaded();
        flow.preview_mut().unwrap().set_all(false);
        assert_matches!(flow.confirm(), Err(FlowError::EmptySelection));
        assert_eq!(flow.stage(), FlowStage::Preview);
    }

    #[test]
    fn unsupported_file_yields_preview_with_error() {
        let mut flow = ImportFlow::new(Uuid::new_v4(), Locale::En);
        let result = flow.load_file("cover.png", b"\x89PNG").unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(!flow.preview().unwrap().can_confirm());
    }

    #[tokio::test]
    async fn loading_a_new_file_discards_previous_state() {
        let mut flow = loaded();
        flow.preview_mut().unwrap().toggle(0).unwrap();
        flow.confirm().unwrap().commit(&MemorySink::new()).await.unwrap();

        flow.load_file("more.txt", b"Hyperion\n").unwrap();
        assert_eq!(flow.stage(), FlowStage::Preview);
        assert!(flow.session().is_none());
        let preview = flow.preview().unwrap();
        assert_eq!(preview.row_count(), 1);
        assert!(preview.all_selected());
        assert_eq!(flow.filename(), Some("more.txt"));
    }

    #[test]
    fn running_session_blocks_file_changes() {
        let mut flow = loaded();
        let plan = flow.confirm().unwrap().begin_run().unwrap();
        assert!(plan.is_some());

        assert_matches!(flow.load_file("x.txt", b"X\n"), Err(FlowError::Busy));
        assert_matches!(flow.clear_file(), Err(FlowError::Busy));
        assert_matches!(flow.confirm(), Err(FlowError::Busy));
    }

    #[tokio::test]
    async fn completed_session_is_not_imported_twice() {
        let mut flow = loaded();
        let sink = MemorySink::new();
        flow.confirm().unwrap().commit(&sink).await.unwrap();

        assert_matches!(flow.confirm(), Err(FlowError::Busy));
        assert_matches!(
            flow.session_mut().unwrap().commit(&sink).await,
            Err(SessionError::InvalidTransition { state: "completed", .. })
        );
        assert_eq!(sink.titles(), vec!["Dune", "Foundation", "Neuromancer"]);

        flow.load_file("books.txt", BOOKS).unwrap();
        flow.confirm().unwrap();
        assert_eq!(flow.stage(), FlowStage::Importing);
    }

    #[test]
    fn paused_session_blocks_file_changes_until_decided() {
        let mut flow = loaded();
        {
            let session = flow.confirm().unwrap();
            let plan = session.begin_run().unwrap().unwrap();
            session.request_cancel();
            session.finish_run(plan.run_id(), Ok(vec![1])).unwrap();
        }
        assert!(flow.is_unsettled());

        assert_matches!(flow.load_file("x.txt", b"X\n"), Err(FlowError::Busy));
        assert_matches!(flow.clear_file(), Err(FlowError::Busy));
        assert_eq!(flow.filename(), Some("books.txt"));

        flow.session_mut().unwrap().keep_imported().unwrap();
        assert!(!flow.is_unsettled());
        flow.clear_file().unwrap();
        assert_eq!(flow.stage(), FlowStage::SelectFile);
    }

    #[test]
    fn close_resets_everything_and_stops_the_run() {
        let mut flow = loaded();
        let cancel = {
            let session = flow.confirm().unwrap();
            session.begin_run().unwrap();
            session.cancel_flag()
        };

        flow.close();
        assert!(cancel.is_cancelled());
        assert_eq!(flow.stage(), FlowStage::SelectFile);
        assert!(flow.filename().is_none());
        let snapshot = flow.snapshot();
        assert_eq!(snapshot.row_count, 0);
        assert!(snapshot.session.is_none());
    }

    #[test]
    fn snapshot_reports_selection() {
        let mut flow = loaded();
        flow.preview_mut().unwrap().toggle(2).unwrap();
        let snapshot = flow.snapshot();
        assert_eq!(snapshot.stage, FlowStage::Preview);
        assert_eq!(snapshot.headers, vec!["title".to_string()]);
        assert_eq!(snapshot.selected_count, 2);
        assert!(!snapshot.all_selected);
        assert_eq!(snapshot.page_count, 1);
    }
}
