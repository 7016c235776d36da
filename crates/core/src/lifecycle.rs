//! Session lifecycle engine.
//!
//! Enacts create / start / complete / fail / update / delete on top of a
//! [`SessionStore`]. Every write is a guarded conditional update, so a
//! concurrent change between the read and the write is detected by the store
//! and classified here instead of being overwritten. One event is recorded
//! per successful transition; recorder failures are logged and ignored.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::advisory::{self, SessionWarning};
use crate::error::CoreError;
use crate::store::{event_types, EventRecorder, SessionStore};
use crate::training_session::{
    ensure_completable, normalize_text, parse_session_date, validate_rpe, validate_session_date,
    NewSession, Session, SessionListQuery, SessionPatch, SessionStatus, SetSlots,
    MAX_AI_COMMENT_LENGTH, MAX_NOTES_LENGTH,
};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionCommand {
    pub session_date: String,
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub start_now: bool,
    pub sets: Vec<Option<i32>>,
    pub rpe: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSessionCommand {
    /// Final sets; the planned sets are kept when omitted.
    pub sets: Option<Vec<Option<i32>>>,
    pub rpe: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionCommand {
    /// Version token last observed by the caller.
    pub version: Option<Timestamp>,
    pub session_date: Option<String>,
    pub sets: Option<Vec<Option<i32>>>,
    pub ai_comment: Option<String>,
    pub notes: Option<String>,
}

/// Where a new session came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOrigin {
    Manual,
    Ai { comment: Option<String> },
}

/// A created session with the advisories computed for it.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub session: Session,
    pub warnings: Vec<SessionWarning>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct SessionLifecycle {
    store: Arc<dyn SessionStore>,
    events: Arc<dyn EventRecorder>,
}

impl SessionLifecycle {
    pub fn new(store: Arc<dyn SessionStore>, events: Arc<dyn EventRecorder>) -> Self {
        Self { store, events }
    }

    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    // -- reads --------------------------------------------------------------

    pub async fn get(&self, user_id: DbId, id: DbId) -> Result<Session, CoreError> {
        self.load(user_id, id).await
    }

    pub async fn list(
        &self,
        user_id: DbId,
        query: &SessionListQuery,
    ) -> Result<Vec<Session>, CoreError> {
        Ok(self.store.list_for_user(user_id, query).await?)
    }

    // -- create -------------------------------------------------------------

    pub async fn create(
        &self,
        user_id: DbId,
        cmd: CreateSessionCommand,
        now: Timestamp,
    ) -> Result<CreatedSession, CoreError> {
        self.create_with_origin(user_id, cmd, SessionOrigin::Manual, now)
            .await
    }

    pub async fn create_with_origin(
        &self,
        user_id: DbId,
        cmd: CreateSessionCommand,
        origin: SessionOrigin,
        now: Timestamp,
    ) -> Result<CreatedSession, CoreError> {
        let session_date = parse_session_date(&cmd.session_date)?;

        if let Some(status) = cmd.status.filter(|s| cmd.start_now && *s != SessionStatus::Planned) {
            return Err(CoreError::validation(
                "startNow",
                format!("startNow cannot be combined with status '{status}'"),
            ));
        }
        let status = cmd.status.unwrap_or(SessionStatus::Planned);

        validate_session_date(session_date, status, now)?;
        let sets = SetSlots::from_input(&cmd.sets)?;
        let rpe = validate_rpe(cmd.rpe, status)?;

        if status == SessionStatus::Completed {
            ensure_completable(&sets)?;
            if rpe.is_none() {
                return Err(CoreError::validation(
                    "rpe",
                    "rpe is required when recording a completed session",
                ));
            }
        }

        let notes = normalize_text("notes", cmd.notes.as_deref(), MAX_NOTES_LENGTH)?;
        let (is_ai_generated, ai_comment) = match &origin {
            SessionOrigin::Manual => (false, None),
            SessionOrigin::Ai { comment } => (
                true,
                normalize_text("aiComment", comment.as_deref(), MAX_AI_COMMENT_LENGTH)?,
            ),
        };

        if let Some(active) =
            advisory::blocking_session(self.store(), user_id, status, cmd.start_now).await?
        {
            return Err(CoreError::ActiveSessionConflict {
                active_session_id: Some(active.id),
            });
        }

        let warnings = advisory::collect_warnings(self.store(), user_id, session_date, true).await?;

        let insert_status = if cmd.start_now {
            SessionStatus::Planned
        } else {
            status
        };
        let session = self
            .store
            .insert(&NewSession {
                user_id,
                status: insert_status,
                session_date,
                sets,
                rpe,
                is_ai_generated,
                ai_comment,
                notes,
            })
            .await?;

        tracing::info!(
            session_id = session.id,
            user_id,
            status = %session.status,
            warnings = warnings.len(),
            "Session created",
        );
        self.record(
            user_id,
            event_types::SESSION_CREATED,
            json!({
                "sessionId": session.id,
                "status": session.status,
                "sessionDate": session.session_date,
                "totalReps": session.total_reps,
                "isAiGenerated": session.is_ai_generated,
                "warnings": warnings,
            }),
        )
        .await;

        let session = if cmd.start_now {
            let patch = SessionPatch::transition(SessionStatus::Planned, SessionStatus::InProgress);
            self.apply_transition(&session, SessionStatus::InProgress, patch)
                .await?
        } else {
            session
        };

        Ok(CreatedSession { session, warnings })
    }

    // -- transitions --------------------------------------------------------

    pub async fn start(&self, user_id: DbId, id: DbId) -> Result<Session, CoreError> {
        let session = self.load(user_id, id).await?;
        require_status(&session, SessionStatus::Planned, "start")?;

        self.apply_transition(
            &session,
            SessionStatus::InProgress,
            SessionPatch::transition(SessionStatus::Planned, SessionStatus::InProgress),
        )
        .await
    }

    pub async fn complete(
        &self,
        user_id: DbId,
        id: DbId,
        cmd: CompleteSessionCommand,
    ) -> Result<Session, CoreError> {
        let session = self.load(user_id, id).await?;
        require_status(&session, SessionStatus::InProgress, "complete")?;

        let sets = match &cmd.sets {
            Some(values) => SetSlots::from_input(values)?,
            None => session.sets,
        };
        ensure_completable(&sets)?;
        let rpe = validate_rpe(cmd.rpe, SessionStatus::Completed)?;

        let mut patch =
            SessionPatch::transition(SessionStatus::InProgress, SessionStatus::Completed);
        patch.sets = Some(sets);
        patch.rpe = rpe;
        if session.is_ai_generated && sets != session.sets {
            patch.is_modified = Some(true);
        }

        self.apply_transition(&session, SessionStatus::Completed, patch)
            .await
    }

    pub async fn fail(&self, user_id: DbId, id: DbId) -> Result<Session, CoreError> {
        let session = self.load(user_id, id).await?;
        require_status(&session, SessionStatus::InProgress, "fail")?;

        self.apply_transition(
            &session,
            SessionStatus::Failed,
            SessionPatch::transition(SessionStatus::InProgress, SessionStatus::Failed),
        )
        .await
    }

    // -- edit ---------------------------------------------------------------

    pub async fn update(
        &self,
        user_id: DbId,
        id: DbId,
        cmd: UpdateSessionCommand,
        now: Timestamp,
    ) -> Result<Session, CoreError> {
        let expected = cmd.version.ok_or_else(|| {
            CoreError::validation("version", "the session version is required for updates")
        })?;

        let session = self.load(user_id, id).await?;
        ensure_mutable(&session, "edit")?;
        if session.version() != expected {
            return Err(CoreError::VersionConflict {
                expected,
                current: session.version(),
            });
        }

        let mut patch = SessionPatch {
            allowed_statuses: SessionStatus::ACTIVE.to_vec(),
            expected_version: Some(expected),
            ..Default::default()
        };
        let mut changed: Vec<&'static str> = Vec::new();

        if let Some(raw) = &cmd.session_date {
            let date = parse_session_date(raw)?;
            validate_session_date(date, session.status, now)?;
            patch.session_date = Some(date);
            changed.push("sessionDate");
        }

        if let Some(values) = &cmd.sets {
            let sets = SetSlots::from_input(values)?;
            if sets != session.sets {
                patch.sets = Some(sets);
                if session.is_ai_generated {
                    patch.is_modified = Some(true);
                }
                changed.push("sets");
            }
        }

        if let Some(comment) = &cmd.ai_comment {
            if !session.is_ai_generated {
                return Err(CoreError::validation(
                    "aiComment",
                    "aiComment can only be set on AI-generated sessions",
                ));
            }
            patch.ai_comment = Some(normalize_text(
                "aiComment",
                Some(comment),
                MAX_AI_COMMENT_LENGTH,
            )?);
            changed.push("aiComment");
        }

        if let Some(notes) = &cmd.notes {
            patch.notes = Some(normalize_text("notes", Some(notes), MAX_NOTES_LENGTH)?);
            changed.push("notes");
        }

        let updated = match self.store.update(id, user_id, &patch).await? {
            Some(updated) => updated,
            None => {
                return Err(self
                    .explain_rejected_write(user_id, id, "edit", Some(expected))
                    .await)
            }
        };

        tracing::info!(session_id = id, user_id, fields = ?changed, "Session updated");
        self.record(
            user_id,
            event_types::SESSION_UPDATED,
            json!({
                "sessionId": id,
                "changedFields": changed,
                "totalReps": updated.total_reps,
                "isModified": updated.is_modified,
            }),
        )
        .await;

        Ok(updated)
    }

    // -- delete -------------------------------------------------------------

    pub async fn delete(&self, user_id: DbId, id: DbId) -> Result<(), CoreError> {
        let session = self.load(user_id, id).await?;
        ensure_mutable(&session, "delete")?;

        if !self.store.delete(id, user_id).await? {
            return Err(self.explain_rejected_write(user_id, id, "delete", None).await);
        }

        tracing::info!(session_id = id, user_id, "Session deleted");
        self.record(
            user_id,
            event_types::SESSION_DELETED,
            json!({ "sessionId": id, "status": session.status }),
        )
        .await;

        Ok(())
    }

    // -- helpers ------------------------------------------------------------

    async fn load(&self, user_id: DbId, id: DbId) -> Result<Session, CoreError> {
        self.store
            .find_by_id(id, user_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Session",
                id,
            })
    }

    async fn apply_transition(
        &self,
        session: &Session,
        to: SessionStatus,
        patch: SessionPatch,
    ) -> Result<Session, CoreError> {
        let attempted = transition_verb(to);
        let updated = match self.store.update(session.id, session.user_id, &patch).await? {
            Some(updated) => updated,
            None => {
                return Err(self
                    .explain_rejected_write(session.user_id, session.id, attempted, None)
                    .await)
            }
        };

        tracing::info!(
            session_id = updated.id,
            user_id = updated.user_id,
            from = %session.status,
            to = %updated.status,
            "Session transitioned",
        );

        let event_type = match to {
            SessionStatus::InProgress => event_types::SESSION_STARTED,
            SessionStatus::Completed => event_types::SESSION_COMPLETED,
            SessionStatus::Failed => event_types::SESSION_FAILED,
            SessionStatus::Planned => event_types::SESSION_UPDATED,
        };
        self.record(
            updated.user_id,
            event_type,
            json!({
                "sessionId": updated.id,
                "from": session.status,
                "to": updated.status,
                "totalReps": updated.total_reps,
                "rpe": updated.rpe,
            }),
        )
        .await;

        Ok(updated)
    }

    /// Classify a guarded write that matched no row by re-reading it.
    async fn explain_rejected_write(
        &self,
        user_id: DbId,
        id: DbId,
        attempted: &'static str,
        expected_version: Option<Timestamp>,
    ) -> CoreError {
        let current = match self.store.find_by_id(id, user_id).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                return CoreError::NotFound {
                    entity: "Session",
                    id,
                }
            }
            Err(e) => return e.into(),
        };

        if let Err(e) = ensure_mutable(&current, attempted) {
            return e;
        }
        if let Some(expected) = expected_version.filter(|v| *v != current.version()) {
            return CoreError::VersionConflict {
                expected,
                current: current.version(),
            };
        }
        CoreError::InvalidState {
            current: current.status,
            attempted,
            message: format!("session is {} and cannot {attempted} right now", current.status),
        }
    }

    async fn record(&self, user_id: DbId, event_type: &str, payload: serde_json::Value) {
        if let Err(e) = self.events.append(user_id, event_type, payload).await {
            tracing::warn!(
                error = %e,
                user_id,
                event_type,
                "Failed to record session event; continuing",
            );
        }
    }
}

fn transition_verb(to: SessionStatus) -> &'static str {
    match to {
        SessionStatus::InProgress => "start",
        SessionStatus::Completed => "complete",
        SessionStatus::Failed => "fail",
        SessionStatus::Planned => "plan",
    }
}

fn require_status(
    session: &Session,
    required: SessionStatus,
    attempted: &'static str,
) -> Result<(), CoreError> {
    if session.status == required {
        return Ok(());
    }
    let message = match (required, attempted) {
        (SessionStatus::Planned, _) => "only planned sessions can be started".to_string(),
        (SessionStatus::InProgress, "complete") => {
            "only in-progress sessions can be completed".to_string()
        }
        (SessionStatus::InProgress, _) => "only in-progress sessions can be failed".to_string(),
        _ => format!("session is {} and cannot {attempted}", session.status),
    };
    Err(CoreError::InvalidState {
        current: session.status,
        attempted,
        message,
    })
}

fn ensure_mutable(session: &Session, action: &'static str) -> Result<(), CoreError> {
    if session.status.is_terminal() {
        return Err(CoreError::Immutable {
            status: session.status,
            message: format!("cannot {action} completed or failed sessions"),
        });
    }
    Ok(())
}
