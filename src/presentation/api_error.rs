// Error responses for HTTP handlers
use crate::application::ingest_service::SubmitError;
use crate::application::readings_service::QueryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        if err.is_caller_error() {
            tracing::warn!(error = %err, "rejected readings query");
            Self::bad_request(err.to_string())
        } else {
            tracing::error!(error = ?err, "readings query failed");
            Self::internal("An internal exception was raised")
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        if err.is_caller_error() {
            tracing::warn!(error = %err, "rejected reading submission");
            Self::bad_request(err.to_string())
        } else {
            tracing::error!(error = ?err, "reading submission failed");
            Self::internal("An internal exception was raised")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
