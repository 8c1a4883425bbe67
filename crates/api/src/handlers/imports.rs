//! Handlers for the spreadsheet bulk importer.
//!
//! Provides endpoints for file upload (multipart), preview pages, row
//! selection, the resumable commit run and the paused-batch decisions.

use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use painel_db::models::media_item::MediaCollection;
use painel_pipeline::flow::FlowSnapshot;
use painel_pipeline::{
    BatchFailure, BatchInserter, ImportFlow, RunPlan, SessionError, SessionState, SinkError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::registry::SessionHandle;
use crate::response::DataResponse;
use crate::state::AppState;

type SnapshotResponse = Json<DataResponse<FlowSnapshot>>;

fn snapshot_response(flow: &ImportFlow) -> SnapshotResponse {
    Json(DataResponse {
        data: flow.snapshot(),
    })
}

/// Read the `file` part of a multipart upload.
async fn read_upload(multipart: &mut Multipart) -> AppResult<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("Uploaded file has no name".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        return Ok((filename, data.to_vec()));
    }

    Err(AppError::BadRequest(
        "Multipart upload has no 'file' field".to_string(),
    ))
}

// ── Create / replace file ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateImportParams {
    pub collection: Option<String>,
}

/// POST /api/v1/imports
///
/// Parse the uploaded file and open a new import flow in the preview stage.
/// Unsupported or empty files still open a flow; the reason is in `errors`.
pub async fn create_import(
    State(state): State<AppState>,
    Query(params): Query<CreateImportParams>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, SnapshotResponse)> {
    let collection = match params.collection.as_deref() {
        None => MediaCollection::default(),
        Some(name) => MediaCollection::parse(name)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown collection '{name}'")))?,
    };
    let (filename, data) = read_upload(&mut multipart).await?;

    let mut flow = ImportFlow::new(Uuid::new_v4(), state.config.import.locale)
        .with_events(Arc::clone(&state.event_bus));
    flow.load_file(&filename, &data)?;
    let response = snapshot_response(&flow);

    let handle = state.registry.insert(flow, collection).await;
    tracing::info!(
        session_id = %handle.id(),
        %collection,
        filename = %filename,
        bytes = data.len(),
        "Import session opened",
    );

    Ok((StatusCode::CREATED, response))
}

/// PUT /api/v1/imports/{id}/file
///
/// Replace the file, discarding the previous result and selection.
pub async fn replace_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<SnapshotResponse> {
    let handle = state.registry.get(id).await?;
    let (filename, data) = read_upload(&mut multipart).await?;

    let mut flow = handle.lock().await;
    flow.load_file(&filename, &data)?;
    Ok(snapshot_response(&flow))
}

/// DELETE /api/v1/imports/{id}/file
///
/// Return the flow to file selection, forgetting the parsed result.
pub async fn clear_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<SnapshotResponse> {
    let handle = state.registry.get(id).await?;
    let mut flow = handle.lock().await;
    flow.clear_file()?;
    Ok(snapshot_response(&flow))
}

// ── Status and preview ───────────────────────────────────────────────

/// GET /api/v1/imports/{id}
pub async fn get_import(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<SnapshotResponse> {
    let handle = state.registry.get(id).await?;
    let flow = handle.lock().await;
    Ok(snapshot_response(&flow))
}

#[derive(Debug, Deserialize)]
pub struct RowsParams {
    pub page: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RowsPage {
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub total_rows: usize,
    pub rows: serde_json::Value,
}

/// GET /api/v1/imports/{id}/rows?page=N
///
/// One page of parsed rows with their selection flags. Pages are 1-based.
pub async fn get_rows(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<RowsParams>,
) -> AppResult<Json<DataResponse<RowsPage>>> {
    let handle = state.registry.get(id).await?;
    let flow = handle.lock().await;
    let preview = flow
        .preview()
        .ok_or(painel_pipeline::FlowError::NoFile)?;

    let page = params.page.unwrap_or(1);
    let rows = preview.page(page)?;
    let rows = serde_json::to_value(&rows)
        .map_err(|e| AppError::InternalError(format!("Failed to serialize rows: {e}")))?;

    Ok(Json(DataResponse {
        data: RowsPage {
            page,
            page_count: preview.page_count(),
            page_size: preview.page_size(),
            total_rows: preview.row_count(),
            rows,
        },
    }))
}

// ── Selection ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub index: usize,
}

/// POST /api/v1/imports/{id}/selection/toggle
pub async fn toggle_row(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ToggleRequest>,
) -> AppResult<SnapshotResponse> {
    let handle = state.registry.get(id).await?;
    let mut flow = handle.lock().await;
    flow.preview_mut()?.toggle(body.index)?;
    Ok(snapshot_response(&flow))
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub indices: Vec<usize>,
}

/// PUT /api/v1/imports/{id}/selection
///
/// Replace the selection with exactly `indices`.
pub async fn set_selection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SelectionRequest>,
) -> AppResult<SnapshotResponse> {
    let handle = state.registry.get(id).await?;
    let mut flow = handle.lock().await;
    flow.preview_mut()?.select_only(&body.indices)?;
    Ok(snapshot_response(&flow))
}

#[derive(Debug, Deserialize)]
pub struct SelectAllRequest {
    pub selected: bool,
}

/// POST /api/v1/imports/{id}/selection/all
pub async fn select_all(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SelectAllRequest>,
) -> AppResult<SnapshotResponse> {
    let handle = state.registry.get(id).await?;
    let mut flow = handle.lock().await;
    flow.preview_mut()?.set_all(body.selected);
    Ok(snapshot_response(&flow))
}

// ── Commit run ───────────────────────────────────────────────────────

/// Drive `plan` on its own task and record the outcome on the session.
///
/// A run task that panics is recorded as a failed run, so the session
/// never stays `Running`.
fn spawn_run(handle: Arc<SessionHandle>, sink: Arc<dyn BatchInserter>, plan: RunPlan) {
    let run_id = plan.run_id();
    let run = tokio::spawn(async move { plan.execute(sink.as_ref()).await });

    tokio::spawn(async move {
        let outcome = run.await.unwrap_or_else(|e| {
            tracing::error!(
                session_id = %handle.id(),
                run_id,
                error = %e,
                "Import run task aborted",
            );
            Err(BatchFailure {
                inserted: Vec::new(),
                error: SinkError::Aborted(e.to_string()),
            })
        });

        let mut flow = handle.lock().await;
        let recorded = flow
            .session_mut()
            .map_err(AppError::from)
            .and_then(|session| {
                session
                    .finish_run(run_id, outcome)
                    .map(|_| ())
                    .map_err(AppError::from)
            });
        if let Err(e) = recorded {
            tracing::debug!(session_id = %handle.id(), error = %e, "Run outcome not recorded");
        }
    });
}

/// POST /api/v1/imports/{id}/commit
///
/// Confirm the selection and start committing it in the background.
/// Progress is available from the status and events endpoints. A completed
/// session is never committed again; load a new file first.
pub async fn commit_import(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, SnapshotResponse)> {
    let handle = state.registry.get(id).await?;
    let mut flow = handle.lock().await;

    if flow.session().is_none() {
        flow.confirm()?;
    }

    let session = flow.session_mut()?;
    if !matches!(session.state(), SessionState::Idle) {
        return Err(SessionError::InvalidTransition {
            action: "commit",
            state: session.state().name(),
        }
        .into());
    }

    let status = match session.begin_run()? {
        Some(plan) => {
            spawn_run(
                Arc::clone(&handle),
                state.backend.sink_for(handle.collection()),
                plan,
            );
            StatusCode::ACCEPTED
        }
        None => StatusCode::OK,
    };
    Ok((status, snapshot_response(&flow)))
}

/// POST /api/v1/imports/{id}/resume
///
/// Continue a paused batch with its uncommitted tail.
pub async fn resume_import(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, SnapshotResponse)> {
    let handle = state.registry.get(id).await?;
    let mut flow = handle.lock().await;
    let session = flow.session_mut()?;

    if !matches!(session.state(), SessionState::Paused { .. }) {
        return Err(SessionError::InvalidTransition {
            action: "resume",
            state: session.state().name(),
        }
        .into());
    }

    let status = match session.begin_run()? {
        Some(plan) => {
            spawn_run(
                Arc::clone(&handle),
                state.backend.sink_for(handle.collection()),
                plan,
            );
            StatusCode::ACCEPTED
        }
        None => StatusCode::OK,
    };
    Ok((status, snapshot_response(&flow)))
}

/// POST /api/v1/imports/{id}/cancel
///
/// Ask the running batch to pause at the next row boundary.
pub async fn cancel_import(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, SnapshotResponse)> {
    let handle = state.registry.get(id).await?;
    let mut flow = handle.lock().await;
    let session = flow.session_mut()?;

    if !session.request_cancel() {
        return Err(SessionError::InvalidTransition {
            action: "cancel",
            state: session.state().name(),
        }
        .into());
    }
    Ok((StatusCode::ACCEPTED, snapshot_response(&flow)))
}

/// POST /api/v1/imports/{id}/keep
///
/// Accept the rows committed before the pause.
pub async fn keep_imported(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<SnapshotResponse> {
    let handle = state.registry.get(id).await?;
    let mut flow = handle.lock().await;
    flow.session_mut()?.keep_imported()?;
    Ok(snapshot_response(&flow))
}

/// POST /api/v1/imports/{id}/discard
///
/// Delete every row the paused batch inserted.
pub async fn discard_imported(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<SnapshotResponse> {
    let handle = state.registry.get(id).await?;
    let sink = state.backend.sink_for(handle.collection());
    let mut flow = handle.lock().await;
    flow.session_mut()?.discard_all(sink.as_ref()).await?;
    Ok(snapshot_response(&flow))
}

/// DELETE /api/v1/imports/{id}
///
/// Close the flow. A running batch is told to stop and its outcome dropped.
pub async fn close_import(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let handle = state.registry.remove(id).await.ok_or_else(|| {
        painel_core::error::CoreError::NotFound {
            entity: "ImportSession",
            id: id.to_string(),
        }
    })?;
    handle.lock().await.close();
    Ok(StatusCode::NO_CONTENT)
}
