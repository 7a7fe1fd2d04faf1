use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::attendance::BackendError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Backend(BackendError),
    InvalidInput(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Backend(err) => write!(f, "attendance backend error: {}", err),
            AppError::InvalidInput(reason) => write!(f, "invalid input: {}", reason),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Backend(err) => Some(err),
            AppError::InvalidInput(_) => None,
        }
    }
}

impl AppError {
    /// Stable identifier clients can branch on without parsing the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Telemetry(_) => "telemetry",
            AppError::Io(_) => "io",
            AppError::Server(_) => "server",
            AppError::Backend(BackendError::Unavailable(_)) => "backend_unavailable",
            AppError::Backend(BackendError::Rejected { .. }) => "backend_rejected",
            AppError::Backend(BackendError::Malformed(_)) => "backend_malformed",
            AppError::InvalidInput(_) => "invalid_input",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Backend(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Backend(err) => err.user_message(),
            other => other.to_string(),
        };
        let body = Json(json!({ "error": message, "code": self.code() }));
        (self.status(), body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<BackendError> for AppError {
    fn from(value: BackendError) -> Self {
        Self::Backend(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn body(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json error body"))
    }

    #[tokio::test]
    async fn invalid_input_maps_to_bad_request() {
        let (status, body) = body(AppError::InvalidInput("latitude out of range".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");
        assert_eq!(body["error"], "invalid input: latitude out of range");
    }

    #[tokio::test]
    async fn backend_failures_carry_their_kind() {
        let (status, body) =
            body(BackendError::Unavailable("connection refused".to_string()).into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "backend_unavailable");

        let rejected = BackendError::Rejected {
            status: 409,
            message: "Attendance already marked".to_string(),
        };
        let (status, body) = self::body(rejected.into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "backend_rejected");
        assert_eq!(body["error"], "Attendance already marked");
    }

    #[test]
    fn codes_are_distinct_per_backend_failure() {
        let malformed = AppError::from(BackendError::Malformed("missing date".to_string()));
        assert_eq!(malformed.code(), "backend_malformed");
        assert_eq!(malformed.status(), StatusCode::BAD_GATEWAY);
    }
}
