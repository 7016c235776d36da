//! Read-only advisory check run before creating a session.
//!
//! Uses the same predicates as
//! [`SessionLifecycle::create`](crate::lifecycle::SessionLifecycle::create) through
//! [`crate::advisory`], and never writes.

use serde::{Deserialize, Serialize};

use crate::advisory::{self, hours_between, round_to_tenth, SessionWarning};
use crate::error::CoreError;
use crate::store::SessionStore;
use crate::training_session::{parse_session_date, SessionStatus};
use crate::types::{DbId, Timestamp};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreflightRequest {
    pub session_date: String,
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub start_now: bool,
    #[serde(default)]
    pub ignore_rest_warning: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastCompletedSession {
    pub id: DbId,
    pub session_date: Timestamp,
    pub status: SessionStatus,
    pub hours_since: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreflightReport {
    pub blocking: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_session_id: Option<DbId>,
    pub warnings: Vec<SessionWarning>,
    pub last_completed_session: Option<LastCompletedSession>,
}

pub async fn preflight(
    store: &dyn SessionStore,
    user_id: DbId,
    request: &PreflightRequest,
    now: Timestamp,
) -> Result<PreflightReport, CoreError> {
    let session_date = parse_session_date(&request.session_date)?;
    let status = request.status.unwrap_or(SessionStatus::Planned);

    let active = advisory::blocking_session(store, user_id, status, request.start_now).await?;
    let warnings = advisory::collect_warnings(
        store,
        user_id,
        session_date,
        !request.ignore_rest_warning,
    )
    .await?;

    let last_completed_session =
        store
            .find_most_recent_terminal(user_id)
            .await?
            .map(|last| LastCompletedSession {
                id: last.id,
                session_date: last.session_date,
                status: last.status,
                hours_since: round_to_tenth(hours_between(last.session_date, now)),
            });

    tracing::debug!(
        user_id,
        blocking = active.is_some(),
        warnings = warnings.len(),
        "Preflight evaluated",
    );

    Ok(PreflightReport {
        blocking: active.is_some(),
        active_session_id: active.map(|s| s.id),
        warnings,
        last_completed_session,
    })
}
