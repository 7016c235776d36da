//! Repository for the `training_sessions` table.

use pullup_core::training_session::{NewSession, SessionPatch, SessionStatus, StatusId};
use pullup_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::training_session::TrainingSessionRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, status_id, session_date, \
                       set_1, set_2, set_3, set_4, set_5, total_reps, rpe, \
                       is_ai_generated, is_modified, ai_comment, notes, created_at, updated_at";

/// Status ids occupying the single active slot.
fn active_ids() -> Vec<StatusId> {
    SessionStatus::ACTIVE.iter().map(|s| s.id()).collect()
}

fn terminal_ids() -> Vec<StatusId> {
    SessionStatus::TERMINAL.iter().map(|s| s.id()).collect()
}

/// Provides CRUD operations for training sessions. Every query is scoped to
/// the owning user.
pub struct TrainingSessionRepo;

impl TrainingSessionRepo {
    /// Insert a new session, returning the created row.
    ///
    /// `total_reps` is a generated column. A second active session for the
    /// user violates `uq_sessions_one_active_per_user`.
    pub async fn create(
        pool: &PgPool,
        input: &NewSession,
    ) -> Result<TrainingSessionRow, sqlx::Error> {
        let [s1, s2, s3, s4, s5] = *input.sets.slots();
        let query = format!(
            "INSERT INTO training_sessions
                (user_id, status_id, session_date, set_1, set_2, set_3, set_4, set_5,
                 rpe, is_ai_generated, ai_comment, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TrainingSessionRow>(&query)
            .bind(input.user_id)
            .bind(input.status.id())
            .bind(input.session_date)
            .bind(s1)
            .bind(s2)
            .bind(s3)
            .bind(s4)
            .bind(s5)
            .bind(input.rpe)
            .bind(input.is_ai_generated)
            .bind(&input.ai_comment)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<TrainingSessionRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM training_sessions WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, TrainingSessionRow>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// The user's planned or in-progress session, if any.
    pub async fn find_active(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<TrainingSessionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM training_sessions
             WHERE user_id = $1 AND status_id = ANY($2)
             ORDER BY session_date DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, TrainingSessionRow>(&query)
            .bind(user_id)
            .bind(active_ids())
            .fetch_optional(pool)
            .await
    }

    /// Latest completed or failed session by session date.
    pub async fn find_most_recent_terminal(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<TrainingSessionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM training_sessions
             WHERE user_id = $1 AND status_id = ANY($2)
             ORDER BY session_date DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, TrainingSessionRow>(&query)
            .bind(user_id)
            .bind(terminal_ids())
            .fetch_optional(pool)
            .await
    }

    /// Latest terminal session dated in `[window_start, window_end]`.
    pub async fn find_recent_terminal_within(
        pool: &PgPool,
        user_id: DbId,
        window_start: Timestamp,
        window_end: Timestamp,
    ) -> Result<Option<TrainingSessionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM training_sessions
             WHERE user_id = $1 AND status_id = ANY($2)
               AND session_date >= $3 AND session_date <= $4
             ORDER BY session_date DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, TrainingSessionRow>(&query)
            .bind(user_id)
            .bind(terminal_ids())
            .bind(window_start)
            .bind(window_end)
            .fetch_optional(pool)
            .await
    }

    /// Count the user's sessions of any status dated in `[start, end)`.
    pub async fn count_in_range(
        pool: &PgPool,
        user_id: DbId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM training_sessions
             WHERE user_id = $1 AND session_date >= $2 AND session_date < $3",
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await
    }

    /// List the user's sessions newest-first, optionally filtered by status.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        status_id: Option<StatusId>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TrainingSessionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM training_sessions
             WHERE user_id = $1 AND ($2::smallint IS NULL OR status_id = $2)
             ORDER BY session_date DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, TrainingSessionRow>(&query)
            .bind(user_id)
            .bind(status_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Apply a guarded patch in a single statement.
    ///
    /// Returns `None` when no row matched: missing, owned by someone else,
    /// in a status outside `allowed_statuses`, or with an `updated_at` that
    /// differs from `expected_version`. `updated_at` always moves forward by
    /// at least one microsecond so the version token changes on every write.
    pub async fn update_guarded(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
        patch: &SessionPatch,
    ) -> Result<Option<TrainingSessionRow>, sqlx::Error> {
        let allowed: Vec<StatusId> = patch.allowed_statuses.iter().map(|s| s.id()).collect();
        let [s1, s2, s3, s4, s5] = patch.sets.map(|s| *s.slots()).unwrap_or_default();
        let query = format!(
            "UPDATE training_sessions SET
                status_id       = COALESCE($4::smallint, status_id),
                session_date    = COALESCE($5::timestamptz, session_date),
                set_1           = CASE WHEN $6::boolean THEN $7::smallint ELSE set_1 END,
                set_2           = CASE WHEN $6::boolean THEN $8::smallint ELSE set_2 END,
                set_3           = CASE WHEN $6::boolean THEN $9::smallint ELSE set_3 END,
                set_4           = CASE WHEN $6::boolean THEN $10::smallint ELSE set_4 END,
                set_5           = CASE WHEN $6::boolean THEN $11::smallint ELSE set_5 END,
                rpe             = COALESCE($12::smallint, rpe),
                ai_comment      = CASE WHEN $13::boolean THEN $14::text ELSE ai_comment END,
                notes           = CASE WHEN $15::boolean THEN $16::text ELSE notes END,
                is_modified     = COALESCE($17::boolean, is_modified),
                updated_at      = GREATEST(clock_timestamp(), updated_at + INTERVAL '1 microsecond')
             WHERE id = $1 AND user_id = $2
               AND (cardinality($3::smallint[]) = 0 OR status_id = ANY($3::smallint[]))
               AND ($18::timestamptz IS NULL OR updated_at = $18::timestamptz)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TrainingSessionRow>(&query)
            .bind(id)
            .bind(user_id)
            .bind(allowed)
            .bind(patch.status.map(SessionStatus::id))
            .bind(patch.session_date)
            .bind(patch.sets.is_some())
            .bind(s1)
            .bind(s2)
            .bind(s3)
            .bind(s4)
            .bind(s5)
            .bind(patch.rpe)
            .bind(patch.ai_comment.is_some())
            .bind(patch.ai_comment.clone().flatten())
            .bind(patch.notes.is_some())
            .bind(patch.notes.clone().flatten())
            .bind(patch.is_modified)
            .bind(patch.expected_version)
            .fetch_optional(pool)
            .await
    }

    /// Delete a planned or in-progress session. Returns `true` if a row was removed.
    pub async fn delete_active(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM training_sessions
             WHERE id = $1 AND user_id = $2 AND status_id = ANY($3)",
        )
        .bind(id)
        .bind(user_id)
        .bind(active_ids())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
