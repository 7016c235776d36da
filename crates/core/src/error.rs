use serde_json::{json, Value};

use crate::training_session::SessionStatus;
use crate::types::{DbId, Timestamp};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed on {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Invalid state: {message}")]
    InvalidState {
        current: SessionStatus,
        attempted: &'static str,
        message: String,
    },

    #[error("Conflict: an active session already exists for this user")]
    ActiveSessionConflict { active_session_id: Option<DbId> },

    #[error("Conflict: the session was modified by another request; refresh and retry")]
    VersionConflict {
        expected: Timestamp,
        current: Timestamp,
    },

    #[error("Forbidden: {message}")]
    Immutable {
        status: SessionStatus,
        message: String,
    },

    #[error("Quota exceeded: {limit} generations per 24 hours")]
    QuotaExceeded {
        limit: i64,
        resets_at: Timestamp,
        next_window_seconds: i64,
    },

    #[error("Feature disabled: {0}")]
    FeatureDisabled(&'static str),

    #[error("Generation failed: {reason}")]
    GenerationFailed { reason: String, timed_out: bool },

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl CoreError {
    /// Shorthand for a field-level validation error.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Validation { .. } => "VALIDATION_ERROR",
            CoreError::InvalidState { .. } => "INVALID_STATE",
            CoreError::ActiveSessionConflict { .. } => "ACTIVE_SESSION_CONFLICT",
            CoreError::VersionConflict { .. } => "VERSION_CONFLICT",
            CoreError::Immutable { .. } => "IMMUTABLE",
            CoreError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            CoreError::FeatureDisabled(_) => "FEATURE_DISABLED",
            CoreError::GenerationFailed { .. } => "GENERATION_FAILED",
            CoreError::Infrastructure(_) => "INFRASTRUCTURE_ERROR",
        }
    }

    /// Machine-readable details so callers never have to parse messages.
    ///
    /// Infrastructure errors carry no details; their message may contain
    /// driver output that must not reach clients.
    pub fn details(&self) -> Value {
        match self {
            CoreError::NotFound { entity, id } => json!({ "entity": entity, "id": id }),
            CoreError::Validation { field, message } => {
                json!({ "field": field, "message": message })
            }
            CoreError::InvalidState {
                current, attempted, ..
            } => json!({ "currentStatus": current, "attemptedAction": attempted }),
            CoreError::ActiveSessionConflict { active_session_id } => {
                json!({ "activeSessionId": active_session_id })
            }
            CoreError::VersionConflict { expected, current } => {
                json!({ "expectedVersion": expected, "currentVersion": current })
            }
            CoreError::Immutable { status, .. } => json!({ "status": status }),
            CoreError::QuotaExceeded {
                limit,
                resets_at,
                next_window_seconds,
            } => json!({
                "limit": limit,
                "resetsAt": resets_at,
                "nextWindowSeconds": next_window_seconds,
            }),
            CoreError::FeatureDisabled(feature) => json!({ "feature": feature }),
            CoreError::GenerationFailed { timed_out, .. } => json!({ "timedOut": timed_out }),
            CoreError::Infrastructure(_) => Value::Null,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::Infrastructure(_) | CoreError::GenerationFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_codes_are_distinct() {
        let active = CoreError::ActiveSessionConflict {
            active_session_id: Some(3),
        };
        let now = chrono::Utc::now();
        let version = CoreError::VersionConflict {
            expected: now,
            current: now,
        };
        assert_ne!(active.code(), version.code());
    }

    #[test]
    fn validation_details_name_the_field() {
        let err = CoreError::validation("rpe", "rpe is required");
        assert_eq!(err.details()["field"], "rpe");
        assert!(err.to_string().contains("rpe is required"));
    }

    #[test]
    fn invalid_state_details_carry_current_status() {
        let err = CoreError::InvalidState {
            current: SessionStatus::InProgress,
            attempted: "start",
            message: "only planned sessions can be started".into(),
        };
        assert_eq!(err.details()["currentStatus"], "in_progress");
        assert_eq!(err.details()["attemptedAction"], "start");
    }

    #[test]
    fn infrastructure_details_are_empty() {
        let err = CoreError::Infrastructure("connection refused on 10.0.0.3".into());
        assert!(err.details().is_null());
        assert!(err.is_retryable());
    }
}
