pub mod health;
pub mod imports;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /imports                                  create from upload (POST)
/// /imports/{id}                             status, close
/// /imports/{id}/file                        replace file (PUT)
/// /imports/{id}/rows?page=N                 preview page
/// /imports/{id}/selection                   replace selection (PUT)
/// /imports/{id}/selection/toggle            toggle one row (POST)
/// /imports/{id}/selection/all               select or clear all (POST)
/// /imports/{id}/commit                      start run (POST)
/// /imports/{id}/cancel                      pause run (POST)
/// /imports/{id}/resume                      resume paused run (POST)
/// /imports/{id}/keep                        keep committed rows (POST)
/// /imports/{id}/discard                     delete committed rows (POST)
/// /imports/{id}/events                      SSE event stream
/// ```
pub fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new().nest("/imports", imports::router(max_upload_bytes))
}
