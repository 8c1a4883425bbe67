//! Route definitions for the bulk importer.
//!
//! Mounted at `/imports`.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{import_events, imports};
use crate::state::AppState;

/// Routes mounted at `/imports`.
///
/// ```text
/// POST   /                        -> create_import      (multipart)
/// GET    /{id}                    -> get_import
/// DELETE /{id}                    -> close_import
/// PUT    /{id}/file               -> replace_file       (multipart)
/// DELETE /{id}/file               -> clear_file
/// GET    /{id}/rows               -> get_rows
/// PUT    /{id}/selection          -> set_selection
/// POST   /{id}/selection/toggle   -> toggle_row
/// POST   /{id}/selection/all      -> select_all
/// POST   /{id}/commit             -> commit_import
/// POST   /{id}/cancel             -> cancel_import
/// POST   /{id}/resume             -> resume_import
/// POST   /{id}/keep               -> keep_imported
/// POST   /{id}/discard            -> discard_imported
/// GET    /{id}/events             -> import_event_stream (SSE)
/// ```
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", post(imports::create_import))
        .route(
            "/{id}",
            get(imports::get_import).delete(imports::close_import),
        )
        .route(
            "/{id}/file",
            put(imports::replace_file).delete(imports::clear_file),
        )
        .route("/{id}/rows", get(imports::get_rows))
        .route("/{id}/selection", put(imports::set_selection))
        .route("/{id}/selection/toggle", post(imports::toggle_row))
        .route("/{id}/selection/all", post(imports::select_all))
        .route("/{id}/commit", post(imports::commit_import))
        .route("/{id}/cancel", post(imports::cancel_import))
        .route("/{id}/resume", post(imports::resume_import))
        .route("/{id}/keep", post(imports::keep_imported))
        .route("/{id}/discard", post(imports::discard_imported))
        .route("/{id}/events", get(import_events::import_event_stream))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
