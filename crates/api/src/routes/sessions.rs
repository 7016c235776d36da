//! Route definitions for the `/sessions` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::sessions;
use crate::state::AppState;

/// Routes mounted at `/sessions`.
///
/// ```text
/// GET    /                -> list_sessions
/// POST   /                -> create_session
/// POST   /preflight       -> preflight_session
/// GET    /{id}            -> get_session
/// PATCH  /{id}            -> update_session
/// DELETE /{id}            -> delete_session
/// POST   /{id}/start      -> start_session
/// POST   /{id}/complete   -> complete_session
/// POST   /{id}/fail       -> fail_session
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(sessions::list_sessions).post(sessions::create_session))
        .route("/preflight", post(sessions::preflight_session))
        .route(
            "/{id}",
            get(sessions::get_session)
                .patch(sessions::update_session)
                .delete(sessions::delete_session),
        )
        .route("/{id}/start", post(sessions::start_session))
        .route("/{id}/complete", post(sessions::complete_session))
        .route("/{id}/fail", post(sessions::fail_session))
}
