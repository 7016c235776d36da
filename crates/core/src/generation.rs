//! AI session generation.
//!
//! [`AiSessionGenerator`] gates a [`Generator`] call behind the feature
//! toggle, the rolling quota and the active-session check, then creates the
//! resulting plan through the lifecycle engine. Every attempt is written to
//! the [`GenerationLog`]; only successes count toward the quota.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::advisory::SessionWarning;
use crate::error::CoreError;
use crate::lifecycle::{CreateSessionCommand, SessionLifecycle, SessionOrigin};
use crate::quota::{self, Quota, DEFAULT_DAILY_LIMIT};
use crate::store::{
    event_types, EventRecorder, GeneratedPlan, GenerationLog, GenerationRecord, GenerationRequest,
    GenerationStatus, Generator, GeneratorError, NewGenerationRecord,
};
use crate::training_session::{
    ensure_completable, parse_session_date, validate_session_date, Session, SessionStatus,
    SetSlots, MAX_SET_REPS, SET_SLOT_COUNT,
};
use crate::types::{DbId, Timestamp};

/// Accepted range for the user's current max-effort pull-up count.
pub const MIN_MAX_PULLUPS: i32 = 1;
pub const MAX_MAX_PULLUPS: i32 = 100;

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MODEL: &str = "plan-template-v1";

/// Resolved AI feature configuration, injected once at startup.
#[derive(Debug, Clone)]
pub struct AiSettings {
    pub enabled: bool,
    pub daily_limit: i64,
    pub timeout: Duration,
    pub model: String,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_limit: DEFAULT_DAILY_LIMIT,
            timeout: DEFAULT_GENERATION_TIMEOUT,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSessionCommand {
    pub max_pullups: i32,
    /// Defaults to now.
    pub session_date: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeneratedSession {
    pub session: Session,
    pub warnings: Vec<SessionWarning>,
    pub quota: Quota,
    pub generation_id: Option<DbId>,
}

#[derive(Clone)]
pub struct AiSessionGenerator {
    lifecycle: SessionLifecycle,
    log: Arc<dyn GenerationLog>,
    generator: Arc<dyn Generator>,
    events: Arc<dyn EventRecorder>,
    settings: AiSettings,
}

impl AiSessionGenerator {
    pub fn new(
        lifecycle: SessionLifecycle,
        log: Arc<dyn GenerationLog>,
        generator: Arc<dyn Generator>,
        events: Arc<dyn EventRecorder>,
        settings: AiSettings,
    ) -> Self {
        Self {
            lifecycle,
            log,
            generator,
            events,
            settings,
        }
    }

    pub fn settings(&self) -> &AiSettings {
        &self.settings
    }

    pub async fn quota(&self, user_id: DbId, now: Timestamp) -> Result<Quota, CoreError> {
        self.ensure_enabled()?;
        quota::get_quota(self.log.as_ref(), user_id, now, self.settings.daily_limit).await
    }

    pub async fn generate(
        &self,
        user_id: DbId,
        cmd: GenerateSessionCommand,
        now: Timestamp,
    ) -> Result<GeneratedSession, CoreError> {
        self.ensure_enabled()?;

        if !(MIN_MAX_PULLUPS..=MAX_MAX_PULLUPS).contains(&cmd.max_pullups) {
            return Err(CoreError::validation(
                "maxPullups",
                format!("maxPullups must be between {MIN_MAX_PULLUPS} and {MAX_MAX_PULLUPS}"),
            ));
        }
        let session_date = match cmd.session_date.as_deref() {
            Some(raw) => parse_session_date(raw)?,
            None => now,
        };
        validate_session_date(session_date, SessionStatus::Planned, now)?;

        let quota = self.quota(user_id, now).await?;
        if quota.is_exhausted() {
            return Err(CoreError::QuotaExceeded {
                limit: quota.limit,
                resets_at: quota.resets_at,
                next_window_seconds: quota.next_window_seconds,
            });
        }

        if let Some(active) = self.lifecycle.store().find_active_session(user_id).await? {
            return Err(CoreError::ActiveSessionConflict {
                active_session_id: Some(active.id),
            });
        }

        let request = GenerationRequest {
            max_pullups: cmd.max_pullups,
            model: cmd.model.unwrap_or_else(|| self.settings.model.clone()),
        };
        let prompt = json!({
            "maxPullups": request.max_pullups,
            "model": request.model,
            "sessionDate": session_date,
        });

        let started = Instant::now();
        let call = self.generator.generate(&request);
        let outcome = match tokio::time::timeout(self.settings.timeout, call).await {
            Ok(result) => result.and_then(|plan| plan_sets(&plan).map(|sets| (plan, sets))),
            Err(_) => Err(GeneratorError::Timeout),
        };
        let duration_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

        let (plan, sets) = match outcome {
            Ok(ok) => ok,
            Err(err) => {
                return Err(self
                    .record_failure(user_id, &request, prompt, duration_ms, err, now)
                    .await)
            }
        };

        let created = self
            .lifecycle
            .create_with_origin(
                user_id,
                CreateSessionCommand {
                    session_date: session_date.to_rfc3339(),
                    status: Some(SessionStatus::Planned),
                    start_now: false,
                    sets: sets.slots().iter().map(|s| s.map(i32::from)).collect(),
                    rpe: None,
                    notes: None,
                },
                SessionOrigin::Ai {
                    comment: Some(plan.comment.clone()),
                },
                now,
            )
            .await?;

        let record = self
            .insert_record(NewGenerationRecord {
                user_id,
                session_id: Some(created.session.id),
                status: GenerationStatus::Success,
                duration_ms,
                model: request.model.clone(),
                prompt,
                response: Some(json!({ "sets": plan.sets, "comment": plan.comment })),
                error_message: None,
                created_at: now,
            })
            .await;

        tracing::info!(
            user_id,
            session_id = created.session.id,
            model = %request.model,
            duration_ms,
            "AI session generated",
        );
        self.record_event(
            user_id,
            event_types::AI_GENERATION_SUCCEEDED,
            json!({
                "sessionId": created.session.id,
                "generationId": record.as_ref().map(|r| r.id),
                "model": request.model,
                "durationMs": duration_ms,
            }),
        )
        .await;

        let quota = self.quota(user_id, now).await?;

        Ok(GeneratedSession {
            session: created.session,
            warnings: created.warnings,
            quota,
            generation_id: record.map(|r| r.id),
        })
    }

    fn ensure_enabled(&self) -> Result<(), CoreError> {
        if self.settings.enabled {
            Ok(())
        } else {
            Err(CoreError::FeatureDisabled("ai_generation"))
        }
    }

    async fn record_failure(
        &self,
        user_id: DbId,
        request: &GenerationRequest,
        prompt: serde_json::Value,
        duration_ms: i64,
        err: GeneratorError,
        now: Timestamp,
    ) -> CoreError {
        let timed_out = matches!(err, GeneratorError::Timeout);
        let status = if timed_out {
            GenerationStatus::Timeout
        } else {
            GenerationStatus::Error
        };
        let reason = err.to_string();

        tracing::warn!(user_id, model = %request.model, error = %reason, "AI generation failed");

        self.insert_record(NewGenerationRecord {
            user_id,
            session_id: None,
            status,
            duration_ms,
            model: request.model.clone(),
            prompt,
            response: None,
            error_message: Some(reason.clone()),
            created_at: now,
        })
        .await;

        self.record_event(
            user_id,
            event_types::AI_GENERATION_FAILED,
            json!({ "status": status, "model": request.model, "error": reason }),
        )
        .await;

        CoreError::GenerationFailed { reason, timed_out }
    }

    /// Generation records are an audit trail; a failed insert is logged and
    /// does not undo the user-visible outcome.
    async fn insert_record(&self, record: NewGenerationRecord) -> Option<GenerationRecord> {
        match self.log.insert_generation_record(&record).await {
            Ok(stored) => Some(stored),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    user_id = record.user_id,
                    status = record.status.as_str(),
                    "Failed to write generation record",
                );
                None
            }
        }
    }

    async fn record_event(&self, user_id: DbId, event_type: &str, payload: serde_json::Value) {
        if let Err(e) = self.events.append(user_id, event_type, payload).await {
            tracing::warn!(error = %e, user_id, event_type, "Failed to record generation event");
        }
    }
}

/// Validate generator output into set slots. A plan must be usable as a
/// planned session: five slots, each in range, at least one non-empty.
fn plan_sets(plan: &GeneratedPlan) -> Result<SetSlots, GeneratorError> {
    let sets =
        SetSlots::from_input(&plan.sets).map_err(|e| GeneratorError::InvalidOutput(e.to_string()))?;
    ensure_completable(&sets).map_err(|e| GeneratorError::InvalidOutput(e.to_string()))?;
    Ok(sets)
}

// ---------------------------------------------------------------------------
// Built-in generator
// ---------------------------------------------------------------------------

/// Deterministic plan builder used when no model backend is configured.
///
/// Prescribes five descending sets at 75%..55% of the reported max, each at
/// least one rep and capped at [`MAX_SET_REPS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanTemplateGenerator;

const TEMPLATE_PERCENTAGES: [i32; SET_SLOT_COUNT] = [75, 70, 65, 60, 55];

impl PlanTemplateGenerator {
    pub fn plan_for(max_pullups: i32) -> Vec<Option<i32>> {
        TEMPLATE_PERCENTAGES
            .iter()
            .map(|pct| Some(((max_pullups * pct + 99) / 100).clamp(1, MAX_SET_REPS)))
            .collect()
    }

    fn comment_for(max_pullups: i32) -> String {
        let focus = match max_pullups {
            i32::MIN..=4 => "Keep every rep strict and add slow negatives after the last set.",
            5..=14 => "Rest two minutes between sets and stop each set one rep short of failure.",
            _ => "Hold a one-second pause at the top of each rep to build control under volume.",
        };
        format!("Volume day built from a max of {max_pullups}. {focus}")
    }
}

#[async_trait]
impl Generator for PlanTemplateGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedPlan, GeneratorError> {
        if request.max_pullups < MIN_MAX_PULLUPS {
            return Err(GeneratorError::InvalidOutput(
                "max pull-ups must be positive".into(),
            ));
        }
        Ok(GeneratedPlan {
            sets: Self::plan_for(request.max_pullups),
            comment: Self::comment_for(request.max_pullups),
            duration_ms: 0,
        })
    }
}
