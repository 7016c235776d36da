//! Row model for the `training_sessions` table.

use pullup_core::training_session::{Session, SessionStatus, SetSlots, StatusId};
use pullup_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `training_sessions` table.
#[derive(Debug, Clone, FromRow)]
pub struct TrainingSessionRow {
    pub id: DbId,
    pub user_id: DbId,
    pub status_id: StatusId,
    pub session_date: Timestamp,
    pub set_1: Option<i16>,
    pub set_2: Option<i16>,
    pub set_3: Option<i16>,
    pub set_4: Option<i16>,
    pub set_5: Option<i16>,
    pub total_reps: i32,
    pub rpe: Option<i16>,
    pub is_ai_generated: bool,
    pub is_modified: bool,
    pub ai_comment: Option<String>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// The row carries a `status_id` with no [`SessionStatus`] counterpart.
#[derive(Debug, thiserror::Error)]
#[error("training session {id} has unknown status id {status_id}")]
pub struct UnknownStatus {
    pub id: DbId,
    pub status_id: StatusId,
}

impl TryFrom<TrainingSessionRow> for Session {
    type Error = UnknownStatus;

    fn try_from(row: TrainingSessionRow) -> Result<Self, Self::Error> {
        let status = SessionStatus::from_id(row.status_id).ok_or(UnknownStatus {
            id: row.id,
            status_id: row.status_id,
        })?;

        Ok(Session {
            id: row.id,
            user_id: row.user_id,
            status,
            session_date: row.session_date,
            sets: SetSlots::new([row.set_1, row.set_2, row.set_3, row.set_4, row.set_5]),
            total_reps: row.total_reps,
            rpe: row.rpe,
            is_ai_generated: row.is_ai_generated,
            is_modified: row.is_modified,
            ai_comment: row.ai_comment,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
