use std::collections::BTreeMap;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use validator::ValidationErrors;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    ok: bool,
    status: u16,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, String>>,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    PasswordChangeRequired,
    Forbidden(&'static str),
    BadRequest(String),
    InvalidFields(ValidationErrors),
    NotFound(String),
    Conflict(String),
    TooManyRequests(&'static str),
    Internal(String),
}

pub(crate) const LOGIN_REQUIRED: &str = "Login required";

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    pub(crate) fn login_required() -> Self {
        Self::Unauthorized(LOGIN_REQUIRED)
    }
}

/// First message per field, keyed by field name.
fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, String> {
    errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errors)| {
            errors.first().map(|error| {
                let message = error
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid"));
                (field.to_string(), message)
            })
        })
        .collect()
}

fn error_body(status: StatusCode, error: String) -> Json<ErrorResponse> {
    Json(ErrorResponse { ok: false, status: status.as_u16(), error, fields: None })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let status = StatusCode::UNAUTHORIZED;
                let mut response =
                    (status, error_body(status, message.to_string())).into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::PasswordChangeRequired => {
                let status = StatusCode::FORBIDDEN;
                (status, error_body(status, "Password change required.".to_string()))
                    .into_response()
            }
            ApiError::Forbidden(message) => {
                let status = StatusCode::FORBIDDEN;
                (status, error_body(status, message.to_string())).into_response()
            }
            ApiError::BadRequest(message) => {
                let status = StatusCode::BAD_REQUEST;
                (status, error_body(status, message)).into_response()
            }
            ApiError::InvalidFields(errors) => {
                let status = StatusCode::BAD_REQUEST;
                let body = ErrorResponse {
                    ok: false,
                    status: status.as_u16(),
                    error: "Please correct the highlighted fields.".to_string(),
                    fields: Some(field_messages(&errors)),
                };
                (status, Json(body)).into_response()
            }
            ApiError::NotFound(message) => {
                let status = StatusCode::NOT_FOUND;
                (status, error_body(status, message)).into_response()
            }
            ApiError::Conflict(message) => {
                let status = StatusCode::CONFLICT;
                (status, error_body(status, message)).into_response()
            }
            ApiError::TooManyRequests(message) => {
                let status = StatusCode::TOO_MANY_REQUESTS;
                (status, error_body(status, message.to_string())).into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, error_body(status, "Something went wrong. Please try again.".to_string()))
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use validator::ValidationError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn errors_render_ok_false_with_status() {
        let response = ApiError::NotFound("Class not found.".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["ok"], false);
        assert_eq!(json["status"], 404);
        assert_eq!(json["error"], "Class not found.");
        assert!(json.get("fields").is_none());
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response =
            ApiError::internal("connection reset", "Failed to load user").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert!(!json["error"].as_str().unwrap_or_default().contains("connection reset"));
    }

    #[tokio::test]
    async fn field_errors_are_reported_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add(
            "username",
            ValidationError::new("username").with_message("Username is required.".into()),
        );

        let response = ApiError::InvalidFields(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["fields"]["username"], "Username is required.");
    }

    #[test]
    fn unauthorized_sets_bearer_challenge() {
        let response = ApiError::login_required().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
