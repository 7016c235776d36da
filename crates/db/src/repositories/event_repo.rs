//! Repository for the `session_events` table.

use pullup_core::types::DbId;
use sqlx::PgPool;

use crate::models::event::SessionEventRow;

const COLUMNS: &str = "id, user_id, session_id, event_type, payload, created_at";

/// Append-only audit log of lifecycle events.
pub struct SessionEventRepo;

impl SessionEventRepo {
    /// Insert a new event row, returning the generated ID.
    pub async fn insert(
        pool: &PgPool,
        user_id: DbId,
        session_id: Option<DbId>,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO session_events (user_id, session_id, event_type, payload) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(user_id)
        .bind(session_id)
        .bind(event_type)
        .bind(payload)
        .fetch_one(pool)
        .await
    }

    /// List a user's events newest-first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SessionEventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM session_events
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, SessionEventRow>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
