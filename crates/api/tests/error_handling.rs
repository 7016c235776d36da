//! Tests for `AppError` to HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no router is
//! involved.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use pullup_api::error::AppError;
use pullup_core::error::CoreError;
use pullup_core::training_session::SessionStatus;
use validator::Validate;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn not_found_returns_404() {
    let (status, json) = error_to_response(AppError::Core(CoreError::NotFound {
        entity: "Session",
        id: 42,
    }))
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Session with id 42 not found");
    assert_eq!(json["details"]["id"], 42);
}

#[tokio::test]
async fn validation_returns_400_with_field() {
    let (status, json) =
        error_to_response(CoreError::validation("sets", "at least one set must be positive").into())
            .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "at least one set must be positive");
    assert_eq!(json["details"]["field"], "sets");
}

#[tokio::test]
async fn invalid_state_returns_422() {
    let (status, json) = error_to_response(
        CoreError::InvalidState {
            current: SessionStatus::Planned,
            attempted: "complete",
            message: "only in-progress sessions can be completed".into(),
        }
        .into(),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "INVALID_STATE");
    assert_eq!(json["details"]["currentStatus"], "planned");
    assert_eq!(json["details"]["attemptedAction"], "complete");
}

#[tokio::test]
async fn conflicts_return_409_with_distinct_codes() {
    let (status, json) = error_to_response(
        CoreError::ActiveSessionConflict {
            active_session_id: Some(5),
        }
        .into(),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "ACTIVE_SESSION_CONFLICT");
    assert_eq!(json["details"]["activeSessionId"], 5);

    let at = Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap();
    let (status, json) = error_to_response(
        CoreError::VersionConflict {
            expected: at,
            current: at + chrono::Duration::seconds(1),
        }
        .into(),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "VERSION_CONFLICT");
    assert!(json["details"]["currentVersion"].is_string());
}

#[tokio::test]
async fn immutable_returns_403() {
    let (status, json) = error_to_response(
        CoreError::Immutable {
            status: SessionStatus::Completed,
            message: "cannot edit completed or failed sessions".into(),
        }
        .into(),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "IMMUTABLE");
    assert_eq!(json["error"], "cannot edit completed or failed sessions");
}

#[tokio::test]
async fn quota_exceeded_returns_429_with_retry_after() {
    let err = AppError::Core(CoreError::QuotaExceeded {
        limit: 5,
        resets_at: Utc.with_ymd_and_hms(2026, 5, 11, 8, 0, 0).unwrap(),
        next_window_seconds: 3600,
    });
    let response = err.into_response();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers().get("retry-after").unwrap(), "3600");

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["code"], "QUOTA_EXCEEDED");
    assert_eq!(json["details"]["nextWindowSeconds"], 3600);
}

#[tokio::test]
async fn feature_disabled_returns_503() {
    let (status, json) =
        error_to_response(CoreError::FeatureDisabled("ai_generation").into()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "FEATURE_DISABLED");
}

#[tokio::test]
async fn generation_failed_returns_502() {
    let (status, json) = error_to_response(
        CoreError::GenerationFailed {
            reason: "generator timed out".into(),
            timed_out: true,
        }
        .into(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "GENERATION_FAILED");
    assert_eq!(json["details"]["timedOut"], true);
}

#[tokio::test]
async fn infrastructure_error_is_sanitized() {
    let (status, json) = error_to_response(
        CoreError::Infrastructure("connection refused: 10.0.0.3:5432".into()).into(),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INFRASTRUCTURE_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
    assert!(json["details"].is_null());
}

#[tokio::test]
async fn internal_error_is_sanitized() {
    let (status, json) =
        error_to_response(AppError::InternalError("secret stack trace".into())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert!(!json["error"].as_str().unwrap().contains("secret"));
}

#[tokio::test]
async fn unauthorized_returns_401() {
    let (status, json) =
        error_to_response(AppError::Unauthorized("Missing x-user-id header".into())).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[derive(Validate)]
struct Probe {
    #[validate(range(min = 1, max = 10, message = "rpe must be between 1 and 10"))]
    rpe: i32,
    #[validate(length(max = 3))]
    session_date: String,
}

#[tokio::test]
async fn validator_errors_list_camel_cased_fields() {
    let errors = Probe {
        rpe: 11,
        session_date: "2026-05-10".into(),
    }
    .validate()
    .unwrap_err();

    let (status, json) = error_to_response(errors.into()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(
        json["details"]["fields"]["rpe"][0],
        "rpe must be between 1 and 10"
    );
    assert_eq!(json["details"]["fields"]["sessionDate"][0], "length");
}
