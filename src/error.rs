//! Error taxonomy shared by the upstream client and the HTTP layer.

use std::fmt;

/// Classification of a failed upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RateLimited,
    TransientNetwork,
    Unauthorized,
    InvalidRequest,
    UpstreamServerError,
}

impl ErrorKind {
    /// Only rate limits and transient network failures may succeed on a re-attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::TransientNetwork)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::TransientNetwork => "transient_network",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::UpstreamServerError => "upstream_server_error",
        };
        f.write_str(name)
    }
}

/// Error returned by every upstream operation.
///
/// The variant is the error kind; it is preserved verbatim when retries are
/// exhausted so callers can map it to a status code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Rate limited: {0}. Too many requests, try again later.")]
    RateLimited(String),
    #[error("Network error: {0}")]
    TransientNetwork(String),
    #[error("Unauthorized: {0}. Check PERPLEXITY_API_KEY.")]
    Unauthorized(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Upstream server error: {0}")]
    UpstreamServerError(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::RateLimited(_) => ErrorKind::RateLimited,
            ApiError::TransientNetwork(_) => ErrorKind::TransientNetwork,
            ApiError::Unauthorized(_) => ErrorKind::Unauthorized,
            ApiError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ApiError::UpstreamServerError(_) => ErrorKind::UpstreamServerError,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ApiError::InvalidRequest(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rate_limit_and_network_are_retryable() {
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(ErrorKind::TransientNetwork.is_retryable());
        assert!(!ErrorKind::Unauthorized.is_retryable());
        assert!(!ErrorKind::InvalidRequest.is_retryable());
        assert!(!ErrorKind::UpstreamServerError.is_retryable());
    }

    #[test]
    fn test_api_error_kind() {
        assert_eq!(
            ApiError::RateLimited("x".into()).kind(),
            ErrorKind::RateLimited
        );
        assert_eq!(
            ApiError::UpstreamServerError("x".into()).kind(),
            ErrorKind::UpstreamServerError
        );
        assert!(!ApiError::Unauthorized("x".into()).is_retryable());
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::RateLimited("429".to_string());
        assert!(err.to_string().contains("Rate limited"));

        let err = ApiError::Unauthorized("bad key".to_string());
        assert!(err.to_string().contains("PERPLEXITY_API_KEY"));

        let err = ApiError::InvalidRequest("query is empty".to_string());
        assert_eq!(err.to_string(), "Invalid request: query is empty");
    }
}
