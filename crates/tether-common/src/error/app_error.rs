//! Application error types
//!
//! Tether's error policy is deliberately small: anything inside the event
//! path is logged and swallowed, so the only errors that travel are the
//! ones surfaced to HTTP callers and the ones that abort startup.

use serde::Serialize;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Validation errors
    #[error("User ID must be a numeric snowflake")]
    InvalidUserId,

    // Resource errors
    #[error("User is not being monitored by Tether")]
    UserNotFound,

    #[error("Route does not exist")]
    PageNotFound,

    // Rate limiting
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    // Startup errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to bind listener: {0}")]
    Listen(String),

    // Internal errors
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    /// Get HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidUserId => 400,
            Self::UserNotFound | Self::PageNotFound => 404,
            Self::RateLimitExceeded => 429,
            Self::Config(_) | Self::Listen(_) | Self::Internal(_) => 500,
        }
    }

    /// Get error code for API responses
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidUserId => "INVALID_USER_ID",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::PageNotFound => "PAGE_NOT_FOUND",
            Self::RateLimitExceeded => "RATE_LIMITED",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Listen(_) => "LISTEN_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a client error (4xx)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Error detail serialized inside the `{"error": {...}}` envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        Self::from(&err)
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::InvalidUserId.status_code(), 400);
        assert_eq!(AppError::UserNotFound.status_code(), 404);
        assert_eq!(AppError::PageNotFound.status_code(), 404);
        assert_eq!(AppError::RateLimitExceeded.status_code(), 429);
        assert_eq!(AppError::Config("x".into()).status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::InvalidUserId.error_code(), "INVALID_USER_ID");
        assert_eq!(AppError::UserNotFound.error_code(), "USER_NOT_FOUND");
        assert_eq!(AppError::PageNotFound.error_code(), "PAGE_NOT_FOUND");
    }

    #[test]
    fn test_is_client_error() {
        assert!(AppError::InvalidUserId.is_client_error());
        assert!(AppError::UserNotFound.is_client_error());
        assert!(!AppError::Listen("addr in use".into()).is_client_error());
    }

    #[test]
    fn test_error_response() {
        let response = ErrorResponse::from(AppError::UserNotFound);
        assert_eq!(response.code, "USER_NOT_FOUND");
        assert_eq!(response.message, "User is not being monitored by Tether");
    }
}
