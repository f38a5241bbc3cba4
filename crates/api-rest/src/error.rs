//! Mapping from core failures to HTTP responses.

use api_shared::{AuthFailure, ErrorRes, FieldErrorDto, ValidationErrorRes};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use emr_core::{EmrError, ValidationErrors};

#[derive(Debug)]
pub enum ApiError {
    Auth(AuthFailure),
    /// 422 with per-field messages.
    Validation(ValidationErrors),
    BadRequest(String),
    Unprocessable(String),
    NotFound(String),
    /// The upstream API failed or could not be reached.
    Upstream(String),
    Internal,
}

impl From<AuthFailure> for ApiError {
    fn from(failure: AuthFailure) -> Self {
        Self::Auth(failure)
    }
}

impl From<EmrError> for ApiError {
    fn from(err: EmrError) -> Self {
        match err {
            EmrError::Validation(errors) => Self::Validation(errors),
            EmrError::InvalidInput(message) => Self::Unprocessable(message),
            EmrError::NotFound(what) => Self::NotFound(what),
            EmrError::InvalidCredentials | EmrError::Unauthenticated => {
                Self::Auth(AuthFailure::Unauthenticated)
            }
            EmrError::Transport(message) => Self::Upstream(message),
            other => {
                tracing::error!(error = %other, "unhandled core error");
                Self::Internal
            }
        }
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Auth(AuthFailure::Unauthenticated) => {
                (StatusCode::UNAUTHORIZED, "Missing or invalid token".into())
            }
            Self::Auth(AuthFailure::Forbidden) => {
                (StatusCode::FORBIDDEN, "Insufficient permissions".into())
            }
            Self::Auth(AuthFailure::Unavailable) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Authentication service unavailable".into(),
            ),
            Self::Validation(errors) => (StatusCode::UNPROCESSABLE_ENTITY, errors.to_string()),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::Unprocessable(message) => (StatusCode::UNPROCESSABLE_ENTITY, message.clone()),
            Self::NotFound(what) => (StatusCode::NOT_FOUND, format!("Not found: {what}")),
            Self::Upstream(message) => (StatusCode::BAD_GATEWAY, message.clone()),
            Self::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        match self {
            Self::Validation(errors) => (
                status,
                Json(ValidationErrorRes {
                    success: false,
                    message: "Validation failed".into(),
                    errors: errors.into_vec().into_iter().map(FieldErrorDto::from).collect(),
                }),
            )
                .into_response(),
            _ => (status, Json(ErrorRes::new(message))).into_response(),
        }
    }
}
