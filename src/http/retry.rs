//! Classification of upstream HTTP failures into retryable and terminal ones.

use reqwest::StatusCode;

/// Errors that should not be retried.
#[derive(Debug)]
pub enum NonRetryableError {
    /// Rate limit exceeded (HTTP 429)
    RateLimitExceeded(String),
    /// Authentication failed (HTTP 401)
    AuthenticationFailed(String),
    /// Successful response whose body is not the expected document
    InvalidResponse(String),
    /// Forbidden access (HTTP 403)
    Forbidden(String),
    /// Other client errors that won't succeed on retry
    ClientError(String),
}

impl std::fmt::Display for NonRetryableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NonRetryableError::RateLimitExceeded(msg) => {
                write!(f, "Upstream rate limit exceeded: {}", msg)
            }
            NonRetryableError::AuthenticationFailed(msg) => {
                write!(
                    f,
                    "Authentication failed: {}. Check PKGMIRROR_UPSTREAM_TOKEN.",
                    msg
                )
            }
            NonRetryableError::InvalidResponse(msg) => {
                write!(f, "Invalid upstream response: {}", msg)
            }
            NonRetryableError::Forbidden(msg) => {
                write!(f, "Access forbidden: {}", msg)
            }
            NonRetryableError::ClientError(msg) => {
                write!(f, "Request error: {}", msg)
            }
        }
    }
}

impl std::error::Error for NonRetryableError {}

/// Classifies an error as retryable or non-retryable.
/// Returns Ok(()) if the error is retryable, Err with a user-friendly message if not.
pub fn classify_error(error: &reqwest::Error) -> Result<(), NonRetryableError> {
    match error.status() {
        Some(status) => classify_status(status),
        // Connection errors, timeouts, etc. are retryable
        None => Ok(()),
    }
}

pub(crate) fn classify_status(status: StatusCode) -> Result<(), NonRetryableError> {
    match status {
        StatusCode::UNAUTHORIZED => Err(NonRetryableError::AuthenticationFailed(
            "Invalid or missing authentication token".to_string(),
        )),
        StatusCode::FORBIDDEN => Err(NonRetryableError::Forbidden(
            "Access to this package is forbidden".to_string(),
        )),
        StatusCode::TOO_MANY_REQUESTS => Err(NonRetryableError::RateLimitExceeded(
            "Too many requests".to_string(),
        )),
        s if s.is_client_error() => Err(NonRetryableError::ClientError(format!(
            "HTTP {} error",
            s.as_u16()
        ))),
        // 5xx server errors are retryable
        _ => Ok(()),
    }
}

/// Checks if an error from `error_for_status()` should be retried.
/// Returns the original error if retryable, or a user-friendly NonRetryableError if not.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    match classify_error(&error) {
        Ok(()) => anyhow::Error::from(error),
        Err(non_retryable) => anyhow::Error::from(non_retryable),
    }
}
