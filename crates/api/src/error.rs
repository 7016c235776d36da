use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use pullup_core::error::CoreError;
use serde_json::{json, Map, Value};

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Every variant renders as `{ "error", "code", "details" }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `pullup_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Request body failed declarative field validation.
    #[error("Validation failed: {0}")]
    InvalidInput(#[from] validator::ValidationErrors),

    /// Missing or malformed caller identity.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut retry_after = None;

        let (status, code, message, details) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => {
                let status = match core {
                    CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                    CoreError::Validation { .. } => StatusCode::BAD_REQUEST,
                    CoreError::InvalidState { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    CoreError::ActiveSessionConflict { .. } | CoreError::VersionConflict { .. } => {
                        StatusCode::CONFLICT
                    }
                    CoreError::Immutable { .. } => StatusCode::FORBIDDEN,
                    CoreError::QuotaExceeded {
                        next_window_seconds,
                        ..
                    } => {
                        retry_after = Some(*next_window_seconds);
                        StatusCode::TOO_MANY_REQUESTS
                    }
                    CoreError::FeatureDisabled(_) => StatusCode::SERVICE_UNAVAILABLE,
                    CoreError::GenerationFailed { .. } => StatusCode::BAD_GATEWAY,
                    CoreError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let message = match core {
                    CoreError::NotFound { entity, id } => {
                        format!("{entity} with id {id} not found")
                    }
                    CoreError::Validation { message, .. }
                    | CoreError::InvalidState { message, .. }
                    | CoreError::Immutable { message, .. } => message.clone(),
                    CoreError::Infrastructure(msg) => {
                        tracing::error!(error = %msg, "Infrastructure error");
                        INTERNAL_MESSAGE.to_string()
                    }
                    other => other.to_string(),
                };
                (status, core.code(), message, core.details())
            }

            // --- HTTP-specific errors ---
            AppError::InvalidInput(errors) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Request validation failed".to_string(),
                field_errors(errors),
            ),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), Value::Null)
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), Value::Null)
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    INTERNAL_MESSAGE.to_string(),
                    Value::Null,
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
            "details": details,
        });

        let mut response = (status, axum::Json(body)).into_response();
        if let Some(seconds) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}

/// `{ "fields": { "sessionDate": ["..."] } }` from validator output.
fn field_errors(errors: &validator::ValidationErrors) -> Value {
    let mut fields = Map::new();
    for (field, errs) in errors.field_errors() {
        let messages: Vec<Value> = errs
            .iter()
            .map(|e| match &e.message {
                Some(msg) => Value::String(msg.to_string()),
                None => Value::String(e.code.to_string()),
            })
            .collect();
        fields.insert(camel_case(&field), Value::Array(messages));
    }
    json!({ "fields": fields })
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::camel_case;

    #[test]
    fn field_names_are_camel_cased() {
        assert_eq!(camel_case("session_date"), "sessionDate");
        assert_eq!(camel_case("max_pullups"), "maxPullups");
        assert_eq!(camel_case("rpe"), "rpe");
    }
}
