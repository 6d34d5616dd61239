use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// Closed set of failure classes surfaced to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    MissingCredential,
    /// Key invalid, inactive, or lacking scope. Deliberately not split.
    Forbidden,
    /// No session or failed verification.
    Unauthorized,
    TokenExpired,
    NotFound,
    Conflict,
    /// Deployment defect, e.g. no signing secret.
    ConfigurationError,
    InternalError,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::MissingCredential | Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Unauthorized | Self::TokenExpired => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::ConfigurationError | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the message may be shown to the client as-is
    pub fn is_client_facing(self) -> bool {
        !matches!(self, Self::ConfigurationError | Self::InternalError)
    }
}

/// API error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    /// Internal context. Logged, and shown as `stack` in development only.
    pub detail: Option<String>,
}

/// Wire shape of every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Attached to error responses so the boundary can log and enrich them
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status();
        let message = if self.kind.is_client_facing() {
            self.message.clone()
        } else {
            "Internal server error".to_string()
        };

        let mut response = (
            status,
            Json(ErrorBody {
                message,
                stack: None,
            }),
        )
            .into_response();

        response.extensions_mut().insert(ErrorReport {
            kind: self.kind,
            message: self.message,
            detail: self.detail,
        });

        response
    }
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn missing_credential(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingCredential, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn token_expired() -> Self {
        Self::new(ErrorKind::TokenExpired, "Token expired")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigurationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("Internal server error").with_detail(format!("{err:#}"))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::bad_request(format!("Invalid request: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorKind::MissingCredential.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorKind::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorKind::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorKind::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ErrorKind::ConfigurationError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorKind::InternalError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_message_is_masked() {
        let response = ApiError::configuration("JWT_SECRET is not set").into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert_eq!(report.kind, ErrorKind::ConfigurationError);
        assert_eq!(report.message, "JWT_SECRET is not set");
    }

    #[test]
    fn test_client_error_keeps_message() {
        let response = ApiError::forbidden("Permission denied")
            .with_detail("scope GENERAL missing")
            .into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let report = response.extensions().get::<ErrorReport>().unwrap();
        assert_eq!(report.detail.as_deref(), Some("scope GENERAL missing"));
    }
}
