//! Handlers for the `/sessions` resource.
//!
//! All endpoints require an [`AuthUser`]; every read and write is scoped to
//! the caller's own sessions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use pullup_core::advisory::SessionWarning;
use pullup_core::lifecycle::{CompleteSessionCommand, CreateSessionCommand, UpdateSessionCommand};
use pullup_core::preflight::{self, PreflightRequest};
use pullup_core::projection::{to_detail, to_summary, SessionDetail};
use pullup_core::training_session::{SessionListQuery, SessionStatus};
use pullup_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, message = "sessionDate is required"))]
    pub session_date: String,
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub start_now: bool,
    #[validate(length(equal = 5, message = "exactly 5 set slots are required"))]
    pub sets: Vec<Option<i32>>,
    #[validate(range(min = 1, max = 10, message = "rpe must be between 1 and 10"))]
    pub rpe: Option<i32>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl From<CreateSessionRequest> for CreateSessionCommand {
    fn from(req: CreateSessionRequest) -> Self {
        Self {
            session_date: req.session_date,
            status: req.status,
            start_now: req.start_now,
            sets: req.sets,
            rpe: req.rpe,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSessionRequest {
    #[validate(length(equal = 5, message = "exactly 5 set slots are required"))]
    pub sets: Option<Vec<Option<i32>>>,
    #[validate(range(min = 1, max = 10, message = "rpe must be between 1 and 10"))]
    pub rpe: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    /// Version token from the last read of the session.
    pub version: Option<Timestamp>,
    pub session_date: Option<String>,
    #[validate(length(equal = 5, message = "exactly 5 set slots are required"))]
    pub sets: Option<Vec<Option<i32>>>,
    #[validate(length(max = 2000))]
    pub ai_comment: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl From<UpdateSessionRequest> for UpdateSessionCommand {
    fn from(req: UpdateSessionRequest) -> Self {
        Self {
            version: req.version,
            session_date: req.session_date,
            sets: req.sets,
            ai_comment: req.ai_comment,
            notes: req.notes,
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CreatedSessionResponse {
    pub session: SessionDetail,
    pub warnings: Vec<SessionWarning>,
}

// ---------------------------------------------------------------------------
// Create / preflight
// ---------------------------------------------------------------------------

/// POST /api/v1/sessions
///
/// Returns 201 with the session and any advisory warnings.
pub async fn create_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateSessionRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let created = state
        .lifecycle
        .create(auth.user_id, input.into(), Utc::now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CreatedSessionResponse {
                session: to_detail(&created.session),
                warnings: created.warnings,
            },
        }),
    ))
}

/// POST /api/v1/sessions/preflight
///
/// Read-only check: would a create be blocked, and which warnings apply.
pub async fn preflight_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<PreflightRequest>,
) -> AppResult<impl IntoResponse> {
    let report =
        preflight::preflight(state.sessions.as_ref(), auth.user_id, &input, Utc::now()).await?;
    Ok(Json(DataResponse { data: report }))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/v1/sessions?status=&limit=&offset=
pub async fn list_sessions(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SessionListQuery>,
) -> AppResult<impl IntoResponse> {
    let sessions = state.lifecycle.list(auth.user_id, &query).await?;
    let data: Vec<_> = sessions.iter().map(to_summary).collect();
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = state.lifecycle.get(auth.user_id, id).await?;
    Ok(Json(DataResponse {
        data: to_detail(&session),
    }))
}

// ---------------------------------------------------------------------------
// Edit / delete
// ---------------------------------------------------------------------------

/// PATCH /api/v1/sessions/{id}
///
/// Requires the `version` last read; a stale version yields 409.
pub async fn update_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateSessionRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let session = state
        .lifecycle
        .update(auth.user_id, id, input.into(), Utc::now())
        .await?;
    Ok(Json(DataResponse {
        data: to_detail(&session),
    }))
}

/// DELETE /api/v1/sessions/{id}
///
/// Only planned and in-progress sessions can be deleted.
pub async fn delete_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.lifecycle.delete(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// POST /api/v1/sessions/{id}/start
pub async fn start_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = state.lifecycle.start(auth.user_id, id).await?;
    Ok(Json(DataResponse {
        data: to_detail(&session),
    }))
}

/// POST /api/v1/sessions/{id}/complete
///
/// Body is optional; omitted sets keep the planned values.
pub async fn complete_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    input: Option<Json<CompleteSessionRequest>>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = input.unwrap_or_default();
    input.validate()?;

    let session = state
        .lifecycle
        .complete(
            auth.user_id,
            id,
            CompleteSessionCommand {
                sets: input.sets,
                rpe: input.rpe,
            },
        )
        .await?;
    Ok(Json(DataResponse {
        data: to_detail(&session),
    }))
}

/// POST /api/v1/sessions/{id}/fail
pub async fn fail_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = state.lifecycle.fail(auth.user_id, id).await?;
    Ok(Json(DataResponse {
        data: to_detail(&session),
    }))
}
