pub mod ai;
pub mod health;
pub mod sessions;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /sessions                      list, create
/// /sessions/preflight            advisory check (POST)
/// /sessions/{id}                 get, update (PATCH), delete
/// /sessions/{id}/start           start (POST)
/// /sessions/{id}/complete        complete (POST)
/// /sessions/{id}/fail            fail (POST)
///
/// /ai/quota                      remaining generations
/// /ai/sessions                   generate a planned session (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/sessions", sessions::router())
        .nest("/ai", ai::router())
}
