//! Response projections of [`Session`].

use serde::Serialize;

use crate::training_session::{Session, SessionStatus, SET_SLOT_COUNT};
use crate::types::{DbId, Timestamp};

/// Full view returned by detail, create, update and transition responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    pub id: DbId,
    pub status: SessionStatus,
    pub session_date: Timestamp,
    pub sets: [Option<i16>; SET_SLOT_COUNT],
    pub total_reps: i32,
    pub rpe: Option<i16>,
    pub is_ai_generated: bool,
    pub is_modified: bool,
    pub ai_comment: Option<String>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub version: Timestamp,
}

/// Condensed view used in lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: DbId,
    pub status: SessionStatus,
    pub session_date: Timestamp,
    pub total_reps: i32,
    pub rpe: Option<i16>,
    pub is_ai_generated: bool,
    pub version: Timestamp,
}

pub fn to_detail(session: &Session) -> SessionDetail {
    SessionDetail {
        id: session.id,
        status: session.status,
        session_date: session.session_date,
        sets: *session.sets.slots(),
        total_reps: session.total_reps,
        rpe: session.rpe,
        is_ai_generated: session.is_ai_generated,
        is_modified: session.is_modified,
        ai_comment: session.ai_comment.clone(),
        notes: session.notes.clone(),
        created_at: session.created_at,
        updated_at: session.updated_at,
        version: session.version(),
    }
}

pub fn to_summary(session: &Session) -> SessionSummary {
    SessionSummary {
        id: session.id,
        status: session.status,
        session_date: session.session_date,
        total_reps: session.total_reps,
        rpe: session.rpe,
        is_ai_generated: session.is_ai_generated,
        version: session.version(),
    }
}
