//! Integration tests for the PostgreSQL store adapter.
//!
//! Exercises the guarantees the engines depend on against a real database:
//! - One active session per user (partial unique index)
//! - Guarded conditional updates and version tokens
//! - Generated `total_reps`
//! - Quota reads over `ai_generations`

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use pullup_core::error::CoreError;
use pullup_core::lifecycle::{CompleteSessionCommand, CreateSessionCommand, SessionLifecycle};
use pullup_core::memory::MemoryEventLog;
use pullup_core::store::{
    GenerationLog, GenerationStatus, NewGenerationRecord, SessionStore, StoreError,
};
use pullup_core::training_session::{NewSession, SessionPatch, SessionStatus, SetSlots};
use pullup_db::repositories::SessionEventRepo;
use pullup_db::PgStore;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_session(user_id: i64, status: SessionStatus) -> NewSession {
    NewSession {
        user_id,
        status,
        session_date: Utc::now(),
        sets: SetSlots::new([Some(10), Some(8), None, Some(6), None]),
        rpe: None,
        is_ai_generated: false,
        ai_comment: None,
        notes: None,
    }
}

fn generation(user_id: i64, status: GenerationStatus, hours_ago: i64) -> NewGenerationRecord {
    NewGenerationRecord {
        user_id,
        session_id: None,
        status,
        duration_ms: 120,
        model: "plan-template-v1".into(),
        prompt: serde_json::json!({ "maxPullups": 10 }),
        response: None,
        error_message: None,
        created_at: Utc::now() - Duration::hours(hours_ago),
    }
}

// ---------------------------------------------------------------------------
// Test: insert derives total_reps
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_insert_computes_total_reps(pool: PgPool) {
    let store = PgStore::new(pool);
    let session = store
        .insert(&new_session(1, SessionStatus::Planned))
        .await
        .unwrap();

    assert_eq!(session.total_reps, 24);
    assert_eq!(session.status, SessionStatus::Planned);
    assert_eq!(session.created_at, session.updated_at);
}

// ---------------------------------------------------------------------------
// Test: single active session is enforced by the index
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_second_active_insert_rejected(pool: PgPool) {
    let store = PgStore::new(pool);
    store
        .insert(&new_session(1, SessionStatus::Planned))
        .await
        .unwrap();

    let result = store.insert(&new_session(1, SessionStatus::InProgress)).await;
    assert_matches!(result, Err(StoreError::ActiveSessionExists));

    // Other users and terminal rows are unaffected.
    store
        .insert(&new_session(2, SessionStatus::Planned))
        .await
        .unwrap();
    store
        .insert(&new_session(1, SessionStatus::Failed))
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Test: guarded updates
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_update_respects_status_guard(pool: PgPool) {
    let store = PgStore::new(pool);
    let session = store
        .insert(&new_session(1, SessionStatus::Planned))
        .await
        .unwrap();

    let wrong = SessionPatch::transition(SessionStatus::InProgress, SessionStatus::Completed);
    assert!(store.update(session.id, 1, &wrong).await.unwrap().is_none());

    let start = SessionPatch::transition(SessionStatus::Planned, SessionStatus::InProgress);
    let started = store.update(session.id, 1, &start).await.unwrap().unwrap();
    assert_eq!(started.status, SessionStatus::InProgress);
    assert!(started.updated_at > session.updated_at);

    // Another user's id never matches.
    assert!(store.update(session.id, 2, &start).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_update_with_stale_version_matches_nothing(pool: PgPool) {
    let store = PgStore::new(pool);
    let session = store
        .insert(&new_session(1, SessionStatus::Planned))
        .await
        .unwrap();

    let patch = SessionPatch {
        allowed_statuses: SessionStatus::ACTIVE.to_vec(),
        expected_version: Some(session.version()),
        sets: Some(SetSlots::new([Some(20), None, None, None, None])),
        notes: Some(Some("first".into())),
        ..Default::default()
    };
    let first = store.update(session.id, 1, &patch).await.unwrap().unwrap();
    assert_eq!(first.total_reps, 20);
    assert_eq!(first.notes.as_deref(), Some("first"));

    assert!(store.update(session.id, 1, &patch).await.unwrap().is_none());

    let clear_notes = SessionPatch {
        expected_version: Some(first.version()),
        notes: Some(None),
        ..Default::default()
    };
    let cleared = store.update(session.id, 1, &clear_notes).await.unwrap().unwrap();
    assert_eq!(cleared.notes, None);
    assert_eq!(cleared.sets, first.sets);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_only_removes_active_rows(pool: PgPool) {
    let store = PgStore::new(pool);
    let done = store
        .insert(&new_session(1, SessionStatus::Failed))
        .await
        .unwrap();
    let planned = store
        .insert(&new_session(1, SessionStatus::Planned))
        .await
        .unwrap();

    assert!(!store.delete(done.id, 1).await.unwrap());
    assert!(store.find_by_id(done.id, 1).await.unwrap().is_some());
    assert!(store.delete(planned.id, 1).await.unwrap());
    assert!(store.find_active_session(1).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Test: lifecycle engine over PostgreSQL
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_lifecycle_round_trip(pool: PgPool) {
    let store = Arc::new(PgStore::new(pool.clone()));
    let engine = SessionLifecycle::new(store.clone(), Arc::new(MemoryEventLog::default()));
    let now = Utc::now();

    let created = engine
        .create(
            9,
            CreateSessionCommand {
                session_date: now.to_rfc3339(),
                start_now: true,
                sets: vec![Some(5), Some(5), Some(5), None, None],
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();
    assert_eq!(created.session.status, SessionStatus::InProgress);

    assert_matches!(
        engine
            .create(
                9,
                CreateSessionCommand {
                    session_date: now.to_rfc3339(),
                    sets: vec![None; 5],
                    ..Default::default()
                },
                now,
            )
            .await,
        Err(CoreError::ActiveSessionConflict { .. })
    );

    let done = engine
        .complete(
            9,
            created.session.id,
            CompleteSessionCommand {
                sets: None,
                rpe: Some(7),
            },
        )
        .await
        .unwrap();
    assert_eq!(done.status, SessionStatus::Completed);
    assert_eq!(done.rpe, Some(7));

    assert_matches!(
        engine.delete(9, done.id).await,
        Err(CoreError::Immutable { .. })
    );
}

// ---------------------------------------------------------------------------
// Test: generation log
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_only_recent_successes_count(pool: PgPool) {
    let store = PgStore::new(pool);
    for (status, hours_ago) in [
        (GenerationStatus::Success, 30),
        (GenerationStatus::Success, 5),
        (GenerationStatus::Success, 2),
        (GenerationStatus::Timeout, 1),
        (GenerationStatus::Error, 1),
    ] {
        store
            .insert_generation_record(&generation(1, status, hours_ago))
            .await
            .unwrap();
    }

    let since = Utc::now() - Duration::hours(24);
    assert_eq!(store.count_success_since(1, since).await.unwrap(), 2);

    let earliest = store.earliest_success_since(1, since).await.unwrap().unwrap();
    let expected = Utc::now() - Duration::hours(5);
    assert!((earliest - expected).num_seconds().abs() < 60);

    assert_eq!(store.count_success_since(2, since).await.unwrap(), 0);
    assert!(store.earliest_success_since(2, since).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_generation_session_link_cleared_on_delete(pool: PgPool) {
    let store = PgStore::new(pool);
    let session = store
        .insert(&new_session(1, SessionStatus::Planned))
        .await
        .unwrap();
    let record = store
        .insert_generation_record(&NewGenerationRecord {
            session_id: Some(session.id),
            ..generation(1, GenerationStatus::Success, 0)
        })
        .await
        .unwrap();
    assert_eq!(record.session_id, Some(session.id));

    store.delete(session.id, 1).await.unwrap();

    let since = Utc::now() - Duration::hours(24);
    assert_eq!(store.count_success_since(1, since).await.unwrap(), 1);
}

// ---------------------------------------------------------------------------
// Test: event log
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_event_insert_and_list(pool: PgPool) {
    let payload = serde_json::json!({ "sessionId": 4 });
    SessionEventRepo::insert(&pool, 1, Some(4), "session_created", &payload)
        .await
        .unwrap();
    SessionEventRepo::insert(&pool, 1, Some(4), "session_started", &payload)
        .await
        .unwrap();
    SessionEventRepo::insert(&pool, 2, None, "ai_generation_failed", &payload)
        .await
        .unwrap();

    let events = SessionEventRepo::list_for_user(&pool, 1, 10, 0).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, "session_started");
    assert_eq!(events[0].session_id, Some(4));
}
