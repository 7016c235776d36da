//! Row model for the `ai_generations` table.

use pullup_core::store::{GenerationRecord, GenerationStatus};
use pullup_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `ai_generations` table.
#[derive(Debug, Clone, FromRow)]
pub struct GenerationRow {
    pub id: DbId,
    pub user_id: DbId,
    pub session_id: Option<DbId>,
    pub status: String,
    pub duration_ms: i64,
    pub model: String,
    pub prompt: serde_json::Value,
    pub response: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, thiserror::Error)]
#[error("ai generation {id} has unknown status '{status}'")]
pub struct UnknownGenerationStatus {
    pub id: DbId,
    pub status: String,
}

impl TryFrom<GenerationRow> for GenerationRecord {
    type Error = UnknownGenerationStatus;

    fn try_from(row: GenerationRow) -> Result<Self, Self::Error> {
        let Some(status) = GenerationStatus::parse(&row.status) else {
            return Err(UnknownGenerationStatus {
                id: row.id,
                status: row.status,
            });
        };

        Ok(GenerationRecord {
            id: row.id,
            user_id: row.user_id,
            session_id: row.session_id,
            status,
            duration_ms: row.duration_ms,
            model: row.model,
            prompt: row.prompt,
            response: row.response,
            error_message: row.error_message,
            created_at: row.created_at,
        })
    }
}
