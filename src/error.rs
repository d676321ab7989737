use serde_json::Value;
use thiserror::Error;

/// Outcome of a single messaging API call.
///
/// `Ok` carries the decoded JSON payload; every failure mode maps to exactly
/// one [`ApiError`] variant.
pub type ApiResult<T = Value> = Result<T, ApiError>;

/// Normalized failure taxonomy shared by every provider.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required credential is absent, empty, or still a placeholder.
    /// Raised before any request is built.
    #[error("{0} not configured")]
    NotConfigured(String),

    /// Connection-level failure: DNS, refused, timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    /// A 2xx response whose body was not valid JSON.
    #[error("Invalid JSON in HTTP {status} response: {body}")]
    Parse { status: u16, body: String },

    /// The provider accepted the request but reported it as unsuccessful.
    #[error("{0}")]
    Application(String),

    /// Local argument validation failed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    /// Short label for console output ("Error: ...").
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NotConfigured(_) => "Not configured",
            ApiError::Network(_) => "Network error",
            ApiError::Transport { .. } => "HTTP error",
            ApiError::Parse { .. } => "Invalid response",
            ApiError::Application(_) => "Request rejected",
            ApiError::InvalidInput(_) => "Invalid input",
        }
    }

    /// Diagnostic detail, the raw body for HTTP-level failures.
    pub fn details(&self) -> String {
        match self {
            ApiError::Transport { status, body } => format!("status {status}: {body}"),
            ApiError::Parse { body, .. } => body.clone(),
            ApiError::NotConfigured(what) => format!("{what} not configured"),
            ApiError::Network(reason)
            | ApiError::Application(reason)
            | ApiError::InvalidInput(reason) => reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display_includes_status_and_body() {
        let err = ApiError::Transport {
            status: 401,
            body: r#"{"ok":false}"#.to_string(),
        };
        assert_eq!(err.to_string(), r#"HTTP 401: {"ok":false}"#);
        assert_eq!(err.kind(), "HTTP error");
    }

    #[test]
    fn test_not_configured_details() {
        let err = ApiError::NotConfigured("telegram.bot_token".to_string());
        assert_eq!(err.details(), "telegram.bot_token not configured");
    }
}
