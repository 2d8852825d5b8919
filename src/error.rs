//! # Error Handling
//!
//! This module provides unified error handling for the internal proxy API.
//! Every failure is rendered as `{"error": message}`; the machine-readable code
//! and the request trace ID travel in response headers.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::telemetry::{self, TRACE_ID_HEADER};
use crate::upstream::UpstreamError;

/// Header carrying the error code for programmatic handling.
pub const ERROR_CODE_HEADER: &str = "x-error-code";

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    #[serde(skip)]
    pub code: Box<str>,
    /// Human-readable error message
    #[serde(rename = "error")]
    pub message: Box<str>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip)]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new<C: Into<String>, M: Into<String>>(status: StatusCode, code: C, message: M) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            trace_id: telemetry::current_trace_id().map(String::into_boxed_str),
        }
    }

    /// Missing or invalid request parameter (400)
    pub fn validation<M: Into<String>>(message: M) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
    }

    /// Any failure while serving the request (500)
    pub fn internal<C: Into<String>, M: Into<String>>(code: C, message: M) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        if let Ok(code) = HeaderValue::from_str(&self.code) {
            headers.insert(ERROR_CODE_HEADER, code);
        }
        if let Some(trace_id) = self.trace_id.as_deref()
            && let Ok(value) = HeaderValue::from_str(trace_id)
        {
            headers.insert(TRACE_ID_HEADER, value);
        }

        (self.status, headers, axum::Json(self)).into_response()
    }
}

// Error mappers for common sources

impl From<UpstreamError> for ApiError {
    fn from(error: UpstreamError) -> Self {
        match &error {
            UpstreamError::Configuration(_) => {
                tracing::error!(error = %error, "Upstream adapter is not configured");
            }
            UpstreamError::Network(_) => {
                tracing::error!(error = %error, "Upstream request failed before a response");
            }
            _ => tracing::warn!(error = %error, "Upstream request rejected"),
        }

        Self::internal(error.code(), error.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);
        Self::internal("INTERNAL_SERVER_ERROR", "An internal error occurred")
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::validation(message)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(format!("Invalid query string: {}", rejection.body_text()))
    }
}
