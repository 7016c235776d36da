//! Route definitions for the `/ai` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Routes mounted at `/ai`.
///
/// ```text
/// GET    /quota           -> get_quota
/// POST   /sessions        -> generate_session
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quota", get(generation::get_quota))
        .route("/sessions", post(generation::generate_session))
}
