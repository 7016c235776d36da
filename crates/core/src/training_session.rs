//! Training session model, status state machine and set rules.
//!
//! The status ids mirror the `session_statuses` seed data (1-based
//! SMALLSERIAL) so the `db` crate can store them without a lookup.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

/// Number of set slots on every session.
pub const SET_SLOT_COUNT: usize = 5;

/// Smallest accepted rep count for a non-empty slot.
pub const MIN_SET_REPS: i32 = 1;

/// Largest accepted rep count for a single slot.
pub const MAX_SET_REPS: i32 = 60;

/// Rate of perceived exertion bounds.
pub const MIN_RPE: i32 = 1;
pub const MAX_RPE: i32 = 10;

/// Sessions may not be scheduled further ahead than this.
pub const MAX_FUTURE_DAYS: i64 = 30;

/// Accepted calendar years for a session date. Keeps date arithmetic and
/// Postgres `timestamptz` well inside their ranges.
pub const MIN_SESSION_YEAR: i32 = 1900;
pub const MAX_SESSION_YEAR: i32 = 9999;

/// Maximum length for free-form session notes.
pub const MAX_NOTES_LENGTH: usize = 1_000;

/// Maximum length for an AI coaching comment.
pub const MAX_AI_COMMENT_LENGTH: usize = 2_000;

/// Default page size for session listings.
pub const DEFAULT_LIST_LIMIT: i64 = 20;

/// Upper bound on the page size for session listings.
pub const MAX_LIST_LIMIT: i64 = 100;

/* --------------------------------------------------------------------------
Status state machine
-------------------------------------------------------------------------- */

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum SessionStatus {
    Planned = 1,
    InProgress = 2,
    Completed = 3,
    Failed = 4,
}

impl SessionStatus {
    /// Statuses covered by the one-active-session-per-user constraint.
    pub const ACTIVE: [SessionStatus; 2] = [SessionStatus::Planned, SessionStatus::InProgress];

    /// Statuses that accept no further transitions.
    pub const TERMINAL: [SessionStatus; 2] = [SessionStatus::Completed, SessionStatus::Failed];

    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(SessionStatus::Planned),
            2 => Some(SessionStatus::InProgress),
            3 => Some(SessionStatus::Completed),
            4 => Some(SessionStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Planned => "planned",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }

    /// Statuses reachable from `self` through a lifecycle transition.
    ///
    /// Deletion is not a transition and is handled separately.
    pub fn valid_transitions(self) -> &'static [SessionStatus] {
        match self {
            SessionStatus::Planned => &[SessionStatus::InProgress],
            SessionStatus::InProgress => &[SessionStatus::Completed, SessionStatus::Failed],
            SessionStatus::Completed | SessionStatus::Failed => &[],
        }
    }

    pub fn can_transition(self, to: SessionStatus) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* --------------------------------------------------------------------------
Set slots
-------------------------------------------------------------------------- */

/// The five ordered rep-count slots of a session.
///
/// Construct from untrusted input with [`SetSlots::from_input`]; a slot is
/// either empty or holds a value in `MIN_SET_REPS..=MAX_SET_REPS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetSlots([Option<i16>; SET_SLOT_COUNT]);

impl SetSlots {
    pub fn new(slots: [Option<i16>; SET_SLOT_COUNT]) -> Self {
        Self(slots)
    }

    /// Validate raw slot values.
    ///
    /// Exactly five slots are required. A zero is treated as an empty slot;
    /// negative values and values above [`MAX_SET_REPS`] are rejected.
    pub fn from_input(values: &[Option<i32>]) -> Result<Self, CoreError> {
        if values.len() != SET_SLOT_COUNT {
            return Err(CoreError::validation(
                "sets",
                format!(
                    "exactly {SET_SLOT_COUNT} set slots are required, got {}",
                    values.len()
                ),
            ));
        }

        let mut slots = [None; SET_SLOT_COUNT];
        for (i, value) in values.iter().enumerate() {
            slots[i] = match *value {
                None | Some(0) => None,
                Some(v) if (MIN_SET_REPS..=MAX_SET_REPS).contains(&v) => Some(v as i16),
                Some(v) => {
                    return Err(CoreError::validation(
                        "sets",
                        format!(
                            "set {} must be empty or between {MIN_SET_REPS} and {MAX_SET_REPS}, got {v}",
                            i + 1
                        ),
                    ))
                }
            };
        }

        Ok(Self(slots))
    }

    pub fn slots(&self) -> &[Option<i16>; SET_SLOT_COUNT] {
        &self.0
    }

    /// Sum of the non-empty slots.
    pub fn total_reps(&self) -> i32 {
        self.0.iter().flatten().map(|&v| i32::from(v)).sum()
    }

    pub fn has_positive(&self) -> bool {
        self.0.iter().flatten().any(|&v| v > 0)
    }
}

/* --------------------------------------------------------------------------
Session entity and store payloads
-------------------------------------------------------------------------- */

/// A training session as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: DbId,
    pub user_id: DbId,
    pub status: SessionStatus,
    pub session_date: Timestamp,
    pub sets: SetSlots,
    pub total_reps: i32,
    pub rpe: Option<i16>,
    pub is_ai_generated: bool,
    pub is_modified: bool,
    pub ai_comment: Option<String>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Session {
    /// Opaque optimistic-lock token; changes on every successful write.
    pub fn version(&self) -> Timestamp {
        self.updated_at
    }
}

/// Insert payload for a new session. `total_reps` is derived by the store.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: DbId,
    pub status: SessionStatus,
    pub session_date: Timestamp,
    pub sets: SetSlots,
    pub rpe: Option<i16>,
    pub is_ai_generated: bool,
    pub ai_comment: Option<String>,
    pub notes: Option<String>,
}

/// Conditional patch applied by [`SessionStore::update`](crate::store::SessionStore::update).
///
/// The guards (`allowed_statuses`, `expected_version`) are evaluated in the
/// same statement as the write; a guard mismatch yields `Ok(None)`.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    /// Current status must be one of these. Empty means any status.
    pub allowed_statuses: Vec<SessionStatus>,
    /// Current `updated_at` must equal this value.
    pub expected_version: Option<Timestamp>,

    pub status: Option<SessionStatus>,
    pub session_date: Option<Timestamp>,
    pub sets: Option<SetSlots>,
    pub rpe: Option<i16>,
    pub ai_comment: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub is_modified: Option<bool>,
}

impl SessionPatch {
    /// Patch moving a session from `from` to `to`, guarded on `from`.
    pub fn transition(from: SessionStatus, to: SessionStatus) -> Self {
        debug_assert!(from.can_transition(to), "no transition {from} -> {to}");
        Self {
            allowed_statuses: vec![from],
            status: Some(to),
            ..Default::default()
        }
    }

    /// Whether the guards accept a session in its current state.
    pub fn guards_accept(&self, session: &Session) -> bool {
        let status_ok =
            self.allowed_statuses.is_empty() || self.allowed_statuses.contains(&session.status);
        let version_ok = self
            .expected_version
            .map_or(true, |v| v == session.updated_at);
        status_ok && version_ok
    }
}

/// Filters for listing a user's sessions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionListQuery {
    pub status: Option<SessionStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SessionListQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/* --------------------------------------------------------------------------
Dates
-------------------------------------------------------------------------- */

/// Parse a session date given as RFC 3339 or as a bare `YYYY-MM-DD`
/// (interpreted as midnight UTC).
pub fn parse_session_date(raw: &str) -> Result<Timestamp, CoreError> {
    let raw = raw.trim();
    let parsed = chrono::DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
        })
        .map_err(|_| {
            CoreError::validation(
                "sessionDate",
                format!("'{raw}' is not a valid date; expected RFC 3339 or YYYY-MM-DD"),
            )
        })?;

    if !(MIN_SESSION_YEAR..=MAX_SESSION_YEAR).contains(&parsed.year()) {
        return Err(CoreError::validation(
            "sessionDate",
            format!(
                "session date must fall between the years {MIN_SESSION_YEAR} and {MAX_SESSION_YEAR}"
            ),
        ));
    }
    Ok(parsed)
}

/// Half-open `[start, end)` bounds of the UTC calendar day containing `ts`.
pub fn utc_day_bounds(ts: Timestamp) -> (Timestamp, Timestamp) {
    let start = Utc.from_utc_datetime(&ts.date_naive().and_time(NaiveTime::MIN));
    (start, start + Duration::days(1))
}

/// Check a session date against `now` for a session in `status`.
///
/// Dates more than [`MAX_FUTURE_DAYS`] ahead are rejected, and a date on a
/// UTC calendar day before today only accepts terminal statuses.
pub fn validate_session_date(
    session_date: Timestamp,
    status: SessionStatus,
    now: Timestamp,
) -> Result<(), CoreError> {
    if session_date > now + Duration::days(MAX_FUTURE_DAYS) {
        return Err(CoreError::validation(
            "sessionDate",
            format!("session date cannot be more than {MAX_FUTURE_DAYS} days in the future"),
        ));
    }

    if session_date.date_naive() < now.date_naive() && !status.is_terminal() {
        return Err(CoreError::validation(
            "sessionDate",
            "sessions dated in the past must be completed or failed",
        ));
    }

    Ok(())
}

/// Validate an optional RPE value against the status it will be stored with.
pub fn validate_rpe(rpe: Option<i32>, status: SessionStatus) -> Result<Option<i16>, CoreError> {
    let Some(value) = rpe else {
        return Ok(None);
    };

    if !(MIN_RPE..=MAX_RPE).contains(&value) {
        return Err(CoreError::validation(
            "rpe",
            format!("rpe must be between {MIN_RPE} and {MAX_RPE}"),
        ));
    }

    match status {
        SessionStatus::Completed => Ok(Some(value as i16)),
        SessionStatus::Failed => Err(CoreError::validation(
            "rpe",
            "rpe must not be set on a failed session",
        )),
        SessionStatus::Planned | SessionStatus::InProgress => Err(CoreError::validation(
            "rpe",
            "rpe can only be recorded when a session is completed",
        )),
    }
}

/// A completed session needs at least one positive set.
pub fn ensure_completable(sets: &SetSlots) -> Result<(), CoreError> {
    if sets.has_positive() {
        Ok(())
    } else {
        Err(CoreError::validation(
            "sets",
            "at least one set must be greater than 0",
        ))
    }
}

/// Normalize optional free text: trims, maps blank to `None`, enforces `max_len`.
pub fn normalize_text(
    field: &'static str,
    value: Option<&str>,
    max_len: usize,
) -> Result<Option<String>, CoreError> {
    let Some(text) = value.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    if text.chars().count() > max_len {
        return Err(CoreError::validation(
            field,
            format!("{field} exceeds maximum length of {max_len} characters"),
        ));
    }
    Ok(Some(text.to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn ts(raw: &str) -> Timestamp {
        parse_session_date(raw).unwrap()
    }

    // -----------------------------------------------------------------------
    // State machine
    // -----------------------------------------------------------------------

    #[test]
    fn planned_can_only_start() {
        assert_eq!(
            SessionStatus::Planned.valid_transitions(),
            &[SessionStatus::InProgress]
        );
    }

    #[test]
    fn in_progress_can_complete_or_fail() {
        assert!(SessionStatus::InProgress.can_transition(SessionStatus::Completed));
        assert!(SessionStatus::InProgress.can_transition(SessionStatus::Failed));
        assert!(!SessionStatus::InProgress.can_transition(SessionStatus::Planned));
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        for status in SessionStatus::TERMINAL {
            assert!(status.valid_transitions().is_empty());
            assert!(status.is_terminal());
            assert!(!status.is_active());
        }
    }

    #[test]
    fn status_ids_round_trip() {
        for status in [
            SessionStatus::Planned,
            SessionStatus::InProgress,
            SessionStatus::Completed,
            SessionStatus::Failed,
        ] {
            assert_eq!(SessionStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(SessionStatus::from_id(0), None);
    }

    // -----------------------------------------------------------------------
    // Sets
    // -----------------------------------------------------------------------

    #[test]
    fn total_reps_sums_non_empty_slots() {
        let sets =
            SetSlots::from_input(&[Some(10), Some(12), Some(10), Some(10), Some(11)]).unwrap();
        assert_eq!(sets.total_reps(), 53);

        let sparse = SetSlots::from_input(&[Some(8), None, Some(6), None, None]).unwrap();
        assert_eq!(sparse.total_reps(), 14);
    }

    #[test]
    fn zero_slots_are_normalized_to_empty() {
        let sets = SetSlots::from_input(&[Some(0); 5]).unwrap();
        assert_eq!(sets, SetSlots::default());
        assert!(!sets.has_positive());
    }

    #[test]
    fn wrong_slot_count_rejected() {
        assert_matches!(
            SetSlots::from_input(&[Some(5); 4]),
            Err(CoreError::Validation { field: "sets", .. })
        );
        assert_matches!(
            SetSlots::from_input(&[Some(5); 6]),
            Err(CoreError::Validation { field: "sets", .. })
        );
    }

    #[test]
    fn out_of_range_slot_rejected() {
        assert!(SetSlots::from_input(&[Some(61), None, None, None, None]).is_err());
        assert!(SetSlots::from_input(&[Some(-1), None, None, None, None]).is_err());
        assert!(SetSlots::from_input(&[Some(60), Some(1), None, None, None]).is_ok());
    }

    #[test]
    fn completion_requires_a_positive_set() {
        let err = ensure_completable(&SetSlots::default()).unwrap_err();
        assert!(err.to_string().contains("at least one set must be greater than 0"));
    }

    // -----------------------------------------------------------------------
    // Dates
    // -----------------------------------------------------------------------

    #[test]
    fn parses_rfc3339_and_plain_dates() {
        assert_eq!(ts("2026-03-01"), ts("2026-03-01T00:00:00Z"));
        assert_eq!(ts("2026-03-01T02:00:00+02:00"), ts("2026-03-01T00:00:00Z"));
    }

    #[test]
    fn unparseable_date_rejected() {
        assert_matches!(
            parse_session_date("next tuesday"),
            Err(CoreError::Validation {
                field: "sessionDate",
                ..
            })
        );
    }

    #[test]
    fn day_bounds_cover_the_utc_day() {
        let (start, end) = utc_day_bounds(ts("2026-03-01T17:45:00Z"));
        assert_eq!(start, ts("2026-03-01T00:00:00Z"));
        assert_eq!(end, ts("2026-03-02T00:00:00Z"));
    }

    #[test]
    fn out_of_range_years_are_rejected() {
        for raw in ["+262142-12-31", "-262143-01-01", "1899-12-31", "+10000-01-01T00:00:00Z"] {
            assert_matches!(
                parse_session_date(raw),
                Err(CoreError::Validation { field: "sessionDate", .. }),
                "{raw}"
            );
        }
        assert_eq!(ts("1900-01-01"), ts("1900-01-01T00:00:00Z"));
        assert!(parse_session_date("9999-12-31T23:59:59Z").is_ok());
    }

    #[test]
    fn far_future_date_rejected() {
        let now = ts("2026-03-01T12:00:00Z");
        let planned = SessionStatus::Planned;
        assert!(validate_session_date(ts("2026-03-31T11:00:00Z"), planned, now).is_ok());
        assert!(validate_session_date(ts("2026-04-01T12:00:01Z"), planned, now).is_err());
    }

    #[test]
    fn past_date_requires_terminal_status() {
        let now = ts("2026-03-01T12:00:00Z");
        let yesterday = ts("2026-02-28T20:00:00Z");
        assert!(validate_session_date(yesterday, SessionStatus::Planned, now).is_err());
        assert!(validate_session_date(yesterday, SessionStatus::Completed, now).is_ok());
        assert!(validate_session_date(yesterday, SessionStatus::Failed, now).is_ok());
        // Earlier today is not "in the past" for the calendar-day rule.
        let earlier_today = ts("2026-03-01T01:00:00Z");
        assert!(validate_session_date(earlier_today, SessionStatus::Planned, now).is_ok());
    }

    // -----------------------------------------------------------------------
    // RPE and text
    // -----------------------------------------------------------------------

    #[test]
    fn rpe_rules_follow_status() {
        assert_eq!(validate_rpe(Some(7), SessionStatus::Completed).unwrap(), Some(7));
        assert!(validate_rpe(Some(7), SessionStatus::Failed).is_err());
        assert!(validate_rpe(Some(7), SessionStatus::Planned).is_err());
        assert!(validate_rpe(Some(11), SessionStatus::Completed).is_err());
        assert_eq!(validate_rpe(None, SessionStatus::Failed).unwrap(), None);
    }

    #[test]
    fn blank_text_normalizes_to_none() {
        assert_eq!(normalize_text("notes", Some("   "), 10).unwrap(), None);
        assert_eq!(
            normalize_text("notes", Some(" ok "), 10).unwrap().as_deref(),
            Some("ok")
        );
        assert!(normalize_text("notes", Some("x".repeat(11).as_str()), 10).is_err());
    }

    #[test]
    fn list_query_clamps_paging() {
        let query = SessionListQuery {
            status: None,
            limit: Some(1_000),
            offset: Some(-5),
        };
        assert_eq!(query.limit(), MAX_LIST_LIMIT);
        assert_eq!(query.offset(), 0);
        assert_eq!(SessionListQuery::default().limit(), DEFAULT_LIST_LIMIT);
    }
}
