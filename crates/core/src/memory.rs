//! In-process implementations of the store traits.
//!
//! [`MemorySessionStore`] reproduces the two database guarantees the engines
//! rely on: the one-active-session-per-user unique index and guarded
//! conditional updates. Each call takes the lock once, so a guarded update
//! is atomic in the same way a single `UPDATE ... WHERE` statement is.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::store::{
    EventRecorder, GenerationLog, GenerationRecord, GenerationStatus, NewGenerationRecord,
    RecordError, SessionStore, StoreError, StoreResult,
};
use crate::training_session::{NewSession, Session, SessionListQuery, SessionPatch};
use crate::types::{DbId, Timestamp};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/* --------------------------------------------------------------------------
Sessions
-------------------------------------------------------------------------- */

#[derive(Default)]
struct SessionTable {
    next_id: DbId,
    rows: BTreeMap<DbId, Session>,
    last_version: Option<Timestamp>,
}

impl SessionTable {
    /// Strictly increasing microsecond timestamps, matching Postgres precision.
    fn next_version(&mut self) -> Timestamp {
        let now = Utc::now();
        let now = now - Duration::nanoseconds(i64::from(now.timestamp_subsec_nanos() % 1_000));
        let version = match self.last_version {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_version = Some(version);
        version
    }

    fn has_other_active(&self, user_id: DbId, except: Option<DbId>) -> bool {
        self.rows.values().any(|s| {
            s.user_id == user_id && s.status.is_active() && Some(s.id) != except
        })
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    table: Mutex<SessionTable>,
    unavailable: AtomicBool,
}

impl MemorySessionStore {
    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// All rows for `user_id`, in id order.
    pub fn rows_for(&self, user_id: DbId) -> Vec<Session> {
        lock(&self.table)
            .rows
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store marked unavailable".into()))
        } else {
            Ok(())
        }
    }

    fn select<F>(&self, user_id: DbId, pred: F) -> Vec<Session>
    where
        F: Fn(&Session) -> bool,
    {
        lock(&self.table)
            .rows
            .values()
            .filter(|s| s.user_id == user_id && pred(s))
            .cloned()
            .collect()
    }

    fn latest<F>(&self, user_id: DbId, pred: F) -> Option<Session>
    where
        F: Fn(&Session) -> bool,
    {
        self.select(user_id, pred)
            .into_iter()
            .max_by_key(|s| (s.session_date, s.id))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn find_active_session(&self, user_id: DbId) -> StoreResult<Option<Session>> {
        self.check_available()?;
        Ok(self.latest(user_id, |s| s.status.is_active()))
    }

    async fn find_by_id(&self, id: DbId, user_id: DbId) -> StoreResult<Option<Session>> {
        self.check_available()?;
        Ok(lock(&self.table)
            .rows
            .get(&id)
            .filter(|s| s.user_id == user_id)
            .cloned())
    }

    async fn find_most_recent_terminal(&self, user_id: DbId) -> StoreResult<Option<Session>> {
        self.check_available()?;
        Ok(self.latest(user_id, |s| s.status.is_terminal()))
    }

    async fn count_same_day(
        &self,
        user_id: DbId,
        day_start: Timestamp,
        day_end: Timestamp,
    ) -> StoreResult<i64> {
        self.check_available()?;
        let rows = self.select(user_id, |s| {
            s.session_date >= day_start && s.session_date < day_end
        });
        Ok(rows.len() as i64)
    }

    async fn find_recent_terminal_within(
        &self,
        user_id: DbId,
        window_start: Timestamp,
        window_end: Timestamp,
    ) -> StoreResult<Option<Session>> {
        self.check_available()?;
        Ok(self.latest(user_id, |s| {
            s.status.is_terminal()
                && s.session_date >= window_start
                && s.session_date <= window_end
        }))
    }

    async fn list_for_user(
        &self,
        user_id: DbId,
        query: &SessionListQuery,
    ) -> StoreResult<Vec<Session>> {
        self.check_available()?;
        let mut rows = self.select(user_id, |s| query.status.map_or(true, |st| s.status == st));
        rows.sort_by(|a, b| (b.session_date, b.id).cmp(&(a.session_date, a.id)));
        Ok(rows
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .collect())
    }

    async fn insert(&self, input: &NewSession) -> StoreResult<Session> {
        self.check_available()?;
        let mut table = lock(&self.table);

        if input.status.is_active() && table.has_other_active(input.user_id, None) {
            return Err(StoreError::ActiveSessionExists);
        }

        table.next_id += 1;
        let id = table.next_id;
        let version = table.next_version();
        let session = Session {
            id,
            user_id: input.user_id,
            status: input.status,
            session_date: input.session_date,
            sets: input.sets,
            total_reps: input.sets.total_reps(),
            rpe: input.rpe,
            is_ai_generated: input.is_ai_generated,
            is_modified: false,
            ai_comment: input.ai_comment.clone(),
            notes: input.notes.clone(),
            created_at: version,
            updated_at: version,
        };
        table.rows.insert(id, session.clone());
        Ok(session)
    }

    async fn update(
        &self,
        id: DbId,
        user_id: DbId,
        patch: &SessionPatch,
    ) -> StoreResult<Option<Session>> {
        self.check_available()?;
        let mut table = lock(&self.table);

        let accepted = table
            .rows
            .get(&id)
            .is_some_and(|s| s.user_id == user_id && patch.guards_accept(s));
        if !accepted {
            return Ok(None);
        }

        let activates = patch.status.is_some_and(|st| st.is_active());
        if activates && table.has_other_active(user_id, Some(id)) {
            return Err(StoreError::ActiveSessionExists);
        }

        let version = table.next_version();
        let Some(row) = table.rows.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(status) = patch.status {
            row.status = status;
        }
        if let Some(date) = patch.session_date {
            row.session_date = date;
        }
        if let Some(sets) = patch.sets {
            row.sets = sets;
            row.total_reps = sets.total_reps();
        }
        if let Some(rpe) = patch.rpe {
            row.rpe = Some(rpe);
        }
        if let Some(comment) = &patch.ai_comment {
            row.ai_comment = comment.clone();
        }
        if let Some(notes) = &patch.notes {
            row.notes = notes.clone();
        }
        if let Some(modified) = patch.is_modified {
            row.is_modified = modified;
        }
        row.updated_at = version;

        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: DbId, user_id: DbId) -> StoreResult<bool> {
        self.check_available()?;
        let mut table = lock(&self.table);
        let deletable = table
            .rows
            .get(&id)
            .is_some_and(|s| s.user_id == user_id && s.status.is_active());
        if deletable {
            table.rows.remove(&id);
        }
        Ok(deletable)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_available()
    }
}

/* --------------------------------------------------------------------------
Generation log
-------------------------------------------------------------------------- */

#[derive(Default)]
pub struct MemoryGenerationLog {
    records: Mutex<Vec<GenerationRecord>>,
}

impl MemoryGenerationLog {
    /// Append a bare record with the given status and creation time.
    pub fn seed(&self, user_id: DbId, status: GenerationStatus, created_at: Timestamp) {
        let mut records = lock(&self.records);
        let id = records.len() as DbId + 1;
        records.push(GenerationRecord {
            id,
            user_id,
            session_id: None,
            status,
            duration_ms: 0,
            model: "seed".into(),
            prompt: serde_json::Value::Null,
            response: None,
            error_message: None,
            created_at,
        });
    }

    pub fn records(&self) -> Vec<GenerationRecord> {
        lock(&self.records).clone()
    }

    fn successes_since(&self, user_id: DbId, since: Timestamp) -> Vec<Timestamp> {
        lock(&self.records)
            .iter()
            .filter(|r| {
                r.user_id == user_id
                    && r.status == GenerationStatus::Success
                    && r.created_at >= since
            })
            .map(|r| r.created_at)
            .collect()
    }
}

#[async_trait]
impl GenerationLog for MemoryGenerationLog {
    async fn count_success_since(&self, user_id: DbId, since: Timestamp) -> StoreResult<i64> {
        Ok(self.successes_since(user_id, since).len() as i64)
    }

    async fn earliest_success_since(
        &self,
        user_id: DbId,
        since: Timestamp,
    ) -> StoreResult<Option<Timestamp>> {
        Ok(self.successes_since(user_id, since).into_iter().min())
    }

    async fn insert_generation_record(
        &self,
        record: &NewGenerationRecord,
    ) -> StoreResult<GenerationRecord> {
        let mut records = lock(&self.records);
        let stored = GenerationRecord {
            id: records.len() as DbId + 1,
            user_id: record.user_id,
            session_id: record.session_id,
            status: record.status,
            duration_ms: record.duration_ms,
            model: record.model.clone(),
            prompt: record.prompt.clone(),
            response: record.response.clone(),
            error_message: record.error_message.clone(),
            created_at: record.created_at,
        };
        records.push(stored.clone());
        Ok(stored)
    }
}

/* --------------------------------------------------------------------------
Event log
-------------------------------------------------------------------------- */

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub user_id: DbId,
    pub event_type: String,
    pub payload: serde_json::Value,
}

#[derive(Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<RecordedEvent>>,
    failing: AtomicBool,
}

impl MemoryEventLog {
    /// Make every subsequent append fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        lock(&self.events).clone()
    }

    pub fn event_types(&self) -> Vec<String> {
        lock(&self.events)
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }
}

#[async_trait]
impl EventRecorder for MemoryEventLog {
    async fn append(
        &self,
        user_id: DbId,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), RecordError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RecordError("memory event log marked failing".into()));
        }
        lock(&self.events).push(RecordedEvent {
            user_id,
            event_type: event_type.to_string(),
            payload,
        });
        Ok(())
    }
}
