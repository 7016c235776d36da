//! [`SessionStore`] and [`GenerationLog`] backed by PostgreSQL.

use async_trait::async_trait;
use pullup_core::store::{
    GenerationLog, GenerationRecord, NewGenerationRecord, SessionStore, StoreError, StoreResult,
};
use pullup_core::training_session::{NewSession, Session, SessionListQuery, SessionPatch};
use pullup_core::types::{DbId, Timestamp};

use crate::models::training_session::TrainingSessionRow;
use crate::repositories::{GenerationRepo, TrainingSessionRepo};
use crate::DbPool;

/// Name of the partial unique index enforcing one active session per user.
pub const ACTIVE_SESSION_CONSTRAINT: &str = "uq_sessions_one_active_per_user";

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Translate a sqlx error into the store contract.
///
/// A unique violation on [`ACTIVE_SESSION_CONSTRAINT`] becomes
/// [`StoreError::ActiveSessionExists`]; anything else is logged and reported
/// as unavailable.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505")
            && db_err.constraint() == Some(ACTIVE_SESSION_CONSTRAINT)
        {
            return StoreError::ActiveSessionExists;
        }
    }
    tracing::error!(error = %err, "Database error");
    StoreError::Unavailable(err.to_string())
}

fn to_session(row: TrainingSessionRow) -> StoreResult<Session> {
    Session::try_from(row).map_err(|e| {
        tracing::error!(error = %e, "Corrupt training session row");
        StoreError::Unavailable(e.to_string())
    })
}

fn to_optional_session(row: Option<TrainingSessionRow>) -> StoreResult<Option<Session>> {
    row.map(to_session).transpose()
}

#[async_trait]
impl SessionStore for PgStore {
    async fn find_active_session(&self, user_id: DbId) -> StoreResult<Option<Session>> {
        let row = TrainingSessionRepo::find_active(&self.pool, user_id)
            .await
            .map_err(classify)?;
        to_optional_session(row)
    }

    async fn find_by_id(&self, id: DbId, user_id: DbId) -> StoreResult<Option<Session>> {
        let row = TrainingSessionRepo::find_by_id(&self.pool, id, user_id)
            .await
            .map_err(classify)?;
        to_optional_session(row)
    }

    async fn find_most_recent_terminal(&self, user_id: DbId) -> StoreResult<Option<Session>> {
        let row = TrainingSessionRepo::find_most_recent_terminal(&self.pool, user_id)
            .await
            .map_err(classify)?;
        to_optional_session(row)
    }

    async fn count_same_day(
        &self,
        user_id: DbId,
        day_start: Timestamp,
        day_end: Timestamp,
    ) -> StoreResult<i64> {
        TrainingSessionRepo::count_in_range(&self.pool, user_id, day_start, day_end)
            .await
            .map_err(classify)
    }

    async fn find_recent_terminal_within(
        &self,
        user_id: DbId,
        window_start: Timestamp,
        window_end: Timestamp,
    ) -> StoreResult<Option<Session>> {
        let row = TrainingSessionRepo::find_recent_terminal_within(
            &self.pool,
            user_id,
            window_start,
            window_end,
        )
        .await
        .map_err(classify)?;
        to_optional_session(row)
    }

    async fn list_for_user(
        &self,
        user_id: DbId,
        query: &SessionListQuery,
    ) -> StoreResult<Vec<Session>> {
        TrainingSessionRepo::list_for_user(
            &self.pool,
            user_id,
            query.status.map(|s| s.id()),
            query.limit(),
            query.offset(),
        )
        .await
        .map_err(classify)?
        .into_iter()
        .map(to_session)
        .collect()
    }

    async fn insert(&self, input: &NewSession) -> StoreResult<Session> {
        let row = TrainingSessionRepo::create(&self.pool, input)
            .await
            .map_err(classify)?;
        to_session(row)
    }

    async fn update(
        &self,
        id: DbId,
        user_id: DbId,
        patch: &SessionPatch,
    ) -> StoreResult<Option<Session>> {
        let row = TrainingSessionRepo::update_guarded(&self.pool, id, user_id, patch)
            .await
            .map_err(classify)?;
        to_optional_session(row)
    }

    async fn delete(&self, id: DbId, user_id: DbId) -> StoreResult<bool> {
        TrainingSessionRepo::delete_active(&self.pool, id, user_id)
            .await
            .map_err(classify)
    }

    async fn ping(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await.map_err(classify)
    }
}

#[async_trait]
impl GenerationLog for PgStore {
    async fn count_success_since(&self, user_id: DbId, since: Timestamp) -> StoreResult<i64> {
        GenerationRepo::count_success_since(&self.pool, user_id, since)
            .await
            .map_err(classify)
    }

    async fn earliest_success_since(
        &self,
        user_id: DbId,
        since: Timestamp,
    ) -> StoreResult<Option<Timestamp>> {
        GenerationRepo::earliest_success_since(&self.pool, user_id, since)
            .await
            .map_err(classify)
    }

    async fn insert_generation_record(
        &self,
        record: &NewGenerationRecord,
    ) -> StoreResult<GenerationRecord> {
        let row = GenerationRepo::create(&self.pool, record)
            .await
            .map_err(classify)?;
        GenerationRecord::try_from(row).map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
