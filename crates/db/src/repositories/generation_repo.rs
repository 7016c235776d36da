//! Repository for the `ai_generations` table.

use pullup_core::store::{GenerationStatus, NewGenerationRecord};
use pullup_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::generation::GenerationRow;

const COLUMNS: &str = "id, user_id, session_id, status, duration_ms, model, prompt, response, \
                       error_message, created_at";

/// Append-only access to AI generation attempts.
pub struct GenerationRepo;

impl GenerationRepo {
    pub async fn create(
        pool: &PgPool,
        input: &NewGenerationRecord,
    ) -> Result<GenerationRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO ai_generations
                (user_id, session_id, status, duration_ms, model, prompt, response,
                 error_message, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationRow>(&query)
            .bind(input.user_id)
            .bind(input.session_id)
            .bind(input.status.as_str())
            .bind(input.duration_ms)
            .bind(&input.model)
            .bind(&input.prompt)
            .bind(&input.response)
            .bind(&input.error_message)
            .bind(input.created_at)
            .fetch_one(pool)
            .await
    }

    /// Number of successful generations at or after `since`.
    pub async fn count_success_since(
        pool: &PgPool,
        user_id: DbId,
        since: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM ai_generations
             WHERE user_id = $1 AND status = $2 AND created_at >= $3",
        )
        .bind(user_id)
        .bind(GenerationStatus::Success.as_str())
        .bind(since)
        .fetch_one(pool)
        .await
    }

    pub async fn earliest_success_since(
        pool: &PgPool,
        user_id: DbId,
        since: Timestamp,
    ) -> Result<Option<Timestamp>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT MIN(created_at) FROM ai_generations
             WHERE user_id = $1 AND status = $2 AND created_at >= $3",
        )
        .bind(user_id)
        .bind(GenerationStatus::Success.as_str())
        .bind(since)
        .fetch_one(pool)
        .await
    }

    /// List a user's generation attempts, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<GenerationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ai_generations
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, GenerationRow>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
