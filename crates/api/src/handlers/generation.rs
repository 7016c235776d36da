//! Handlers for the `/ai` resource: quota and AI-generated sessions.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use pullup_core::advisory::SessionWarning;
use pullup_core::generation::GenerateSessionCommand;
use pullup_core::projection::{to_detail, SessionDetail};
use pullup_core::quota::Quota;
use pullup_core::types::DbId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSessionRequest {
    #[validate(range(min = 1, max = 100, message = "maxPullups must be between 1 and 100"))]
    pub max_pullups: i32,
    pub session_date: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSessionResponse {
    pub session: SessionDetail,
    pub warnings: Vec<SessionWarning>,
    pub quota: Quota,
    pub generation_id: Option<DbId>,
}

/// GET /api/v1/ai/quota
pub async fn get_quota(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let quota = state.ai.quota(auth.user_id, Utc::now()).await?;
    Ok(Json(DataResponse { data: quota }))
}

/// POST /api/v1/ai/sessions
///
/// Generates a planned session. Returns 201, or 429 with `Retry-After` when
/// the rolling quota is spent.
pub async fn generate_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<GenerateSessionRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let generated = state
        .ai
        .generate(
            auth.user_id,
            GenerateSessionCommand {
                max_pullups: input.max_pullups,
                session_date: input.session_date,
                model: input.model,
            },
            Utc::now(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: GeneratedSessionResponse {
                session: to_detail(&generated.session),
                warnings: generated.warnings,
                quota: generated.quota,
                generation_id: generated.generation_id,
            },
        }),
    ))
}
