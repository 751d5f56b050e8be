pub mod health;
pub mod jobs;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                      WebSocket progress stream (?token=<jwt>)
///
/// /jobs                    list, create
/// /jobs/{id}               get, delete (admin)
/// /jobs/{id}/start         start a pending job (POST)
/// /jobs/{id}/cancel        cancel an active run (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Job progress stream.
        .route("/ws", get(ws::ws_handler))
        // Generation jobs.
        .nest("/jobs", jobs::router())
}
