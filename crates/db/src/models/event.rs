//! Session event entity model.

use pullup_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `session_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionEventRow {
    pub id: DbId,
    pub user_id: DbId,
    pub session_id: Option<DbId>,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}
