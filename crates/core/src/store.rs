//! Collaborator contracts consumed by the engines.
//!
//! Implemented by `pullup-db` (PostgreSQL), `pullup-events` (event bus) and
//! [`crate::memory`] (in-process, used by tests).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::training_session::{NewSession, Session, SessionListQuery, SessionPatch};
use crate::types::{DbId, Timestamp};

/// Failures surfaced by a store adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The one-active-session-per-user constraint rejected the write.
    #[error("user already has an active session")]
    ActiveSessionExists,

    /// The backing store could not be reached or returned an unexpected error.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ActiveSessionExists => CoreError::ActiveSessionConflict {
                active_session_id: None,
            },
            StoreError::Unavailable(msg) => CoreError::Infrastructure(msg),
        }
    }
}

/* --------------------------------------------------------------------------
Sessions
-------------------------------------------------------------------------- */

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The user's `planned` or `in_progress` session, if any.
    async fn find_active_session(&self, user_id: DbId) -> StoreResult<Option<Session>>;

    async fn find_by_id(&self, id: DbId, user_id: DbId) -> StoreResult<Option<Session>>;

    /// Latest `completed` or `failed` session by session date.
    async fn find_most_recent_terminal(&self, user_id: DbId) -> StoreResult<Option<Session>>;

    /// Number of the user's sessions (any status) dated in `[day_start, day_end)`.
    async fn count_same_day(
        &self,
        user_id: DbId,
        day_start: Timestamp,
        day_end: Timestamp,
    ) -> StoreResult<i64>;

    /// Latest terminal session dated in `[window_start, window_end]`.
    async fn find_recent_terminal_within(
        &self,
        user_id: DbId,
        window_start: Timestamp,
        window_end: Timestamp,
    ) -> StoreResult<Option<Session>>;

    /// Sessions newest-first, filtered and paged by `query`.
    async fn list_for_user(
        &self,
        user_id: DbId,
        query: &SessionListQuery,
    ) -> StoreResult<Vec<Session>>;

    /// Insert a session. Returns [`StoreError::ActiveSessionExists`] when the
    /// row would give the user a second active session.
    async fn insert(&self, input: &NewSession) -> StoreResult<Session>;

    /// Apply `patch` if its guards hold. `Ok(None)` means the row is missing,
    /// not owned by `user_id`, or a guard did not match.
    async fn update(
        &self,
        id: DbId,
        user_id: DbId,
        patch: &SessionPatch,
    ) -> StoreResult<Option<Session>>;

    /// Delete an active session. Returns `false` if nothing was deleted.
    async fn delete(&self, id: DbId, user_id: DbId) -> StoreResult<bool>;

    /// Cheap reachability probe for health checks.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/* --------------------------------------------------------------------------
Generation log
-------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Success,
    Timeout,
    Error,
}

impl GenerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStatus::Success => "success",
            GenerationStatus::Timeout => "timeout",
            GenerationStatus::Error => "error",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "success" => Some(GenerationStatus::Success),
            "timeout" => Some(GenerationStatus::Timeout),
            "error" => Some(GenerationStatus::Error),
            _ => None,
        }
    }
}

/// One AI generation attempt. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    pub id: DbId,
    pub user_id: DbId,
    pub session_id: Option<DbId>,
    pub status: GenerationStatus,
    pub duration_ms: i64,
    pub model: String,
    pub prompt: serde_json::Value,
    pub response: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct NewGenerationRecord {
    pub user_id: DbId,
    pub session_id: Option<DbId>,
    pub status: GenerationStatus,
    pub duration_ms: i64,
    pub model: String,
    pub prompt: serde_json::Value,
    pub response: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
}

#[async_trait]
pub trait GenerationLog: Send + Sync {
    /// Successful generations created at or after `since`.
    async fn count_success_since(&self, user_id: DbId, since: Timestamp) -> StoreResult<i64>;

    async fn earliest_success_since(
        &self,
        user_id: DbId,
        since: Timestamp,
    ) -> StoreResult<Option<Timestamp>>;

    async fn insert_generation_record(
        &self,
        record: &NewGenerationRecord,
    ) -> StoreResult<GenerationRecord>;
}

/* --------------------------------------------------------------------------
Event recorder
-------------------------------------------------------------------------- */

/// Lifecycle event names written by the engines.
pub mod event_types {
    pub const SESSION_CREATED: &str = "session_created";
    pub const SESSION_STARTED: &str = "session_started";
    pub const SESSION_COMPLETED: &str = "session_completed";
    pub const SESSION_FAILED: &str = "session_failed";
    pub const SESSION_UPDATED: &str = "session_updated";
    pub const SESSION_DELETED: &str = "session_deleted";
    pub const AI_GENERATION_SUCCEEDED: &str = "ai_generation_succeeded";
    pub const AI_GENERATION_FAILED: &str = "ai_generation_failed";
}

#[derive(Debug, thiserror::Error)]
#[error("failed to record event: {0}")]
pub struct RecordError(pub String);

/// Append-only audit sink. Errors are reported but callers treat them as
/// non-fatal.
#[async_trait]
pub trait EventRecorder: Send + Sync {
    async fn append(
        &self,
        user_id: DbId,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), RecordError>;
}

/* --------------------------------------------------------------------------
Generator
-------------------------------------------------------------------------- */

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub max_pullups: i32,
    pub model: String,
}

/// Raw generator output; validated by the caller before use.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPlan {
    pub sets: Vec<Option<i32>>,
    pub comment: String,
    pub duration_ms: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("generator timed out")]
    Timeout,

    #[error("generator returned invalid output: {0}")]
    InvalidOutput(String),

    #[error("generator unavailable: {0}")]
    Unavailable(String),
}

/// Opaque plan generator (an LLM in production).
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedPlan, GeneratorError>;
}

