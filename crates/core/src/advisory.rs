//! Advisory checks shared by session creation and preflight.
//!
//! Both the lifecycle engine and the preflight validator call into this
//! module, so the blocking predicate and the warning predicates cannot drift
//! apart.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::store::SessionStore;
use crate::training_session::{utc_day_bounds, Session, SessionStatus};
use crate::types::{DbId, Timestamp};

/// Recommended rest between two sessions, as a rolling window.
pub const REST_PERIOD_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    RestPeriod,
    MultipleSameDay,
}

/// A non-blocking signal returned alongside a successful check or create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionWarning {
    pub code: WarningCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_since: Option<f64>,
}

impl SessionWarning {
    fn rest_period(hours: f64) -> Self {
        let hours = round_to_tenth(hours);
        Self {
            code: WarningCode::RestPeriod,
            message: format!(
                "Your last session was {hours:.1} hours before this one; \
                 at least {REST_PERIOD_HOURS} hours of rest is recommended"
            ),
            hours_since: Some(hours),
        }
    }

    fn multiple_same_day(count: i64) -> Self {
        Self {
            code: WarningCode::MultipleSameDay,
            message: format!("You already have {count} session(s) on this day"),
            hours_since: None,
        }
    }
}

/// Whether a session created with `status` (and `start_now`) would occupy
/// the user's single active slot.
pub fn would_be_active(status: SessionStatus, start_now: bool) -> bool {
    start_now || status.is_active()
}

/// The user's active session, if one would block a new active session.
pub async fn blocking_session(
    store: &dyn SessionStore,
    user_id: DbId,
    status: SessionStatus,
    start_now: bool,
) -> Result<Option<Session>, CoreError> {
    if !would_be_active(status, start_now) {
        return Ok(None);
    }
    Ok(store.find_active_session(user_id).await?)
}

/// Fractional hours from `earlier` to `later`.
pub fn hours_between(earlier: Timestamp, later: Timestamp) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 3_600_000.0
}

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `REST_PERIOD` if a completed or failed session is dated less than
/// [`REST_PERIOD_HOURS`] before `session_date`.
pub async fn rest_period_warning(
    store: &dyn SessionStore,
    user_id: DbId,
    session_date: Timestamp,
) -> Result<Option<SessionWarning>, CoreError> {
    let window_start = session_date - Duration::hours(REST_PERIOD_HOURS);
    let Some(last) = store
        .find_recent_terminal_within(user_id, window_start, session_date)
        .await?
    else {
        return Ok(None);
    };

    let hours = hours_between(last.session_date, session_date);
    if hours >= REST_PERIOD_HOURS as f64 {
        return Ok(None);
    }
    Ok(Some(SessionWarning::rest_period(hours)))
}

/// `MULTIPLE_SAME_DAY` if any session shares the UTC calendar day.
pub async fn same_day_warning(
    store: &dyn SessionStore,
    user_id: DbId,
    session_date: Timestamp,
) -> Result<Option<SessionWarning>, CoreError> {
    let (day_start, day_end) = utc_day_bounds(session_date);
    let count = store.count_same_day(user_id, day_start, day_end).await?;
    Ok((count > 0).then(|| SessionWarning::multiple_same_day(count)))
}

/// Run every advisory check for a prospective session.
///
/// `check_rest_period = false` skips only the rest-period check.
pub async fn collect_warnings(
    store: &dyn SessionStore,
    user_id: DbId,
    session_date: Timestamp,
    check_rest_period: bool,
) -> Result<Vec<SessionWarning>, CoreError> {
    let mut warnings = Vec::new();

    if check_rest_period {
        if let Some(w) = rest_period_warning(store, user_id, session_date).await? {
            warnings.push(w);
        }
    }
    if let Some(w) = same_day_warning(store, user_id, session_date).await? {
        warnings.push(w);
    }

    Ok(warnings)
}
