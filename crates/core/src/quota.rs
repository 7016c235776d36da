//! Rolling 24-hour quota for AI session generation.
//!
//! Only `success` generation records count. The count and the earliest
//! timestamp are two independent reads with no transaction around them, so
//! under concurrent generations the figures can be one step stale and a
//! user may race one generation past the limit. No locking is added here.

use chrono::Duration;
use serde::Serialize;

use crate::error::CoreError;
use crate::store::GenerationLog;
use crate::types::{DbId, Timestamp};

/// Default number of successful generations allowed per rolling window.
pub const DEFAULT_DAILY_LIMIT: i64 = 5;

/// Length of the rolling window in hours.
pub const QUOTA_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quota {
    pub remaining: i64,
    pub limit: i64,
    pub resets_at: Timestamp,
    pub next_window_seconds: i64,
}

impl Quota {
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

fn window() -> Duration {
    Duration::hours(QUOTA_WINDOW_HOURS)
}

/// Pure quota computation from the two log reads.
///
/// When the limit is reached the window resets 24h after the earliest
/// success still inside it. If that read raced with the count and came back
/// empty, a fresh window is reported instead.
pub fn compute_quota(limit: i64, used: i64, earliest: Option<Timestamp>, now: Timestamp) -> Quota {
    let remaining = (limit - used).max(0);

    let resets_at = match earliest {
        Some(earliest) if used >= limit => earliest + window(),
        _ => now + window(),
    };

    let next_window_seconds = if used >= limit && earliest.is_some() {
        (resets_at - now).num_seconds().max(0)
    } else {
        window().num_seconds()
    };

    Quota {
        remaining,
        limit,
        resets_at,
        next_window_seconds,
    }
}

/// Read the user's quota at `now`.
pub async fn get_quota(
    log: &dyn GenerationLog,
    user_id: DbId,
    now: Timestamp,
    limit: i64,
) -> Result<Quota, CoreError> {
    let since = now - window();
    let used = log.count_success_since(user_id, since).await?;

    let earliest = if used >= limit {
        log.earliest_success_since(user_id, since).await?
    } else {
        None
    };

    Ok(compute_quota(limit, used, earliest, now))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::memory::MemoryGenerationLog;
    use crate::store::GenerationStatus;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn fresh_user_gets_full_quota() {
        let q = compute_quota(5, 0, None, now());
        assert_eq!(q.remaining, 5);
        assert_eq!(q.resets_at, now() + Duration::hours(24));
        assert_eq!(q.next_window_seconds, 86_400);
        assert!(!q.is_exhausted());
    }

    #[test]
    fn exhausted_quota_resets_from_earliest_success() {
        let earliest = now() - Duration::hours(20);
        let q = compute_quota(5, 5, Some(earliest), now());
        assert_eq!(q.remaining, 0);
        assert_eq!(q.resets_at, earliest + Duration::hours(24));
        assert_eq!(q.next_window_seconds, 4 * 3600);
    }

    #[test]
    fn over_limit_never_goes_negative() {
        let q = compute_quota(5, 7, Some(now() - Duration::hours(1)), now());
        assert_eq!(q.remaining, 0);
    }

    #[test]
    fn missing_earliest_falls_back_to_fresh_window() {
        let q = compute_quota(5, 5, None, now());
        assert_eq!(q.resets_at, now() + Duration::hours(24));
        assert_eq!(q.next_window_seconds, 86_400);
    }

    #[tokio::test]
    async fn five_recent_successes_exhaust_the_quota() {
        let log = Arc::new(MemoryGenerationLog::default());
        let earliest = now() - Duration::hours(23);
        for h in [23, 10, 5, 2, 1] {
            log.seed(1, GenerationStatus::Success, now() - Duration::hours(h));
        }

        let q = get_quota(log.as_ref(), 1, now(), DEFAULT_DAILY_LIMIT).await.unwrap();
        assert_eq!(q.remaining, 0);
        assert_eq!(q.resets_at, earliest + Duration::hours(24));
        assert_eq!(q.next_window_seconds, 3600);
    }

    #[tokio::test]
    async fn failures_and_old_successes_do_not_count() {
        let log = MemoryGenerationLog::default();
        log.seed(1, GenerationStatus::Timeout, now() - Duration::hours(1));
        log.seed(1, GenerationStatus::Error, now() - Duration::hours(1));
        log.seed(1, GenerationStatus::Success, now() - Duration::hours(25));
        log.seed(1, GenerationStatus::Success, now() - Duration::hours(3));
        log.seed(2, GenerationStatus::Success, now() - Duration::hours(3));

        let q = get_quota(&log, 1, now(), DEFAULT_DAILY_LIMIT).await.unwrap();
        assert_eq!(q.remaining, 4);
        assert_eq!(q.limit, 5);
    }
}
