//! # Error Handling Module
//!
//! This module defines every error the gateway can produce, using the `thiserror` crate,
//! and maps each one to exactly one HTTP response.
//!
//! ## Failure taxonomy
//!
//! - `UnknownRoute` - the path matched no registered service prefix (404)
//! - `ServiceUnavailable` - the pre-forward liveness probe failed (503)
//! - `ForwardingFailure` - transport error on the proxied call after admission (500)
//! - `Internal` and friends - any other fault in the gateway itself (500)
//!
//! `ServiceUnavailable` and `ForwardingFailure` happen at different stages of a request
//! and carry different `error_type()` labels. A forwarding failure reaches the client with
//! the same generic body as an internal error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Main result type used throughout the gateway
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Body returned to clients when the target backend failed its liveness probe
pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "Service unavailable";

/// Body returned to clients for any failure the gateway does not describe further
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong!";

/// Error types for the API Gateway
#[derive(Debug, Error, Clone)]
pub enum GatewayError {
    /// Configuration-related errors (invalid config, unreadable files, bad env values)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// No registered service owns the requested path
    #[error("No service registered for route: {path}")]
    UnknownRoute { path: String },

    /// The backend did not pass its liveness probe, so the request was not forwarded
    #[error("Service unavailable: {service} - {reason}")]
    ServiceUnavailable { service: String, reason: String },

    /// The backend was admitted but the proxied call failed at the transport level
    #[error("Forwarding to {service} failed: {message}")]
    ForwardingFailure { service: String, message: String },

    /// Internal server errors for unexpected failures
    #[error("Internal server error: {message}")]
    Internal { message: String },

    /// I/O errors (listener binding, file reads)
    #[error("I/O error: {message}")]
    Io { message: String },

    /// JSON serialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// YAML parsing errors for configuration files
    #[error("YAML error: {message}")]
    Yaml { message: String },
}

impl GatewayError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unknown route error for the given request path
    pub fn unknown_route<S: Into<String>>(path: S) -> Self {
        Self::UnknownRoute { path: path.into() }
    }

    /// Create a service unavailable error
    pub fn service_unavailable<S: Into<String>, R: Into<String>>(service: S, reason: R) -> Self {
        Self::ServiceUnavailable {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Create a forwarding failure for a call that was already admitted
    pub fn forwarding<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::ForwardingFailure {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code returned to clients for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownRoute { .. } => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::ForwardingFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Configuration { .. }
            | Self::Internal { .. }
            | Self::Io { .. }
            | Self::Json { .. }
            | Self::Yaml { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `error` field of the response body.
    ///
    /// Internal details stay in the logs; clients only ever see one of a few fixed strings.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::UnknownRoute { .. } => "Not found",
            Self::ServiceUnavailable { .. } => SERVICE_UNAVAILABLE_MESSAGE,
            _ => GENERIC_FAILURE_MESSAGE,
        }
    }

    /// Get a string representation of the error type for logs
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration_error",
            Self::UnknownRoute { .. } => "unknown_route",
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::ForwardingFailure { .. } => "forwarding_failure",
            Self::Internal { .. } => "internal_error",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
            Self::Yaml { .. } => "yaml_error",
        }
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for GatewayError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml {
            message: err.to_string(),
        }
    }
}

/// Convert errors into HTTP responses.
///
/// Every failure produces exactly one well-formed JSON body of the shape `{"error": "..."}`.
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(error: GatewayError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            GatewayError::service_unavailable("order", "probe failed").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            GatewayError::forwarding("order", "connection reset").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::unknown_route("/nonexistent").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::config("bad port").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unavailable_and_forwarding_are_distinct_in_logs() {
        let rejected = GatewayError::service_unavailable("user", "down");
        let failed = GatewayError::forwarding("user", "reset");
        assert_ne!(rejected.error_type(), failed.error_type());
    }

    #[tokio::test]
    async fn test_service_unavailable_body() {
        let (status, body) = body_json(GatewayError::service_unavailable("delivery", "timeout")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({ "error": "Service unavailable" }));
    }

    #[tokio::test]
    async fn test_internal_details_are_not_leaked() {
        let (status, body) = body_json(GatewayError::forwarding("order", "tcp reset by 10.0.0.3")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Something went wrong!" }));

        let (_, body) = body_json(GatewayError::internal("lock poisoned")).await;
        assert_eq!(body, json!({ "error": "Something went wrong!" }));
    }
}
