//! Error types for the DingTalk robot client

use thiserror::Error;

/// Errors that can occur while building or sending a robot message
#[derive(Debug, Error)]
pub enum DingTalkError {
    /// Robot configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connection, TLS or timeout failure while talking to the webhook
    #[error("Transport error: {0}")]
    Transport(String),

    /// Webhook answered with a body that is not valid JSON
    #[error("Response is not valid JSON (HTTP {status}): {source}")]
    ResponseFormat {
        /// HTTP status code of the response
        status: u16,
        /// Raw response body, kept for diagnostics
        body: String,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// HMAC key setup failed
    ///
    /// `Hmac<Sha256>` accepts keys of any length, so the built-in signer
    /// does not produce this today.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Outbound payload could not be serialized
    #[error("Failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),

    /// Blocking client could not start its runtime
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl DingTalkError {
    /// Create a configuration error
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a transport error
    #[must_use]
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Check if this error is retryable
    ///
    /// The client itself never retries; this is a hint for callers.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Raw response body, if the error carries one
    #[must_use]
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            Self::ResponseFormat { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DingTalkError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the access token and signature.
        let err = err.without_url();
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Transport(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_error() -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>("<html>").unwrap_err()
    }

    #[test]
    fn configuration_error_display() {
        let err = DingTalkError::config("robot 'ops' is not configured");
        assert_eq!(
            err.to_string(),
            "Configuration error: robot 'ops' is not configured"
        );
    }

    #[test]
    fn transport_error_display() {
        let err = DingTalkError::transport("connection refused");
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }

    #[test]
    fn response_format_error_keeps_body() {
        let err = DingTalkError::ResponseFormat {
            status: 502,
            body: "<html>Bad Gateway</html>".to_string(),
            source: parse_error(),
        };
        assert!(err.to_string().contains("502"));
        assert_eq!(err.raw_body(), Some("<html>Bad Gateway</html>"));
    }

    #[test]
    fn raw_body_absent_for_other_errors() {
        assert!(DingTalkError::config("x").raw_body().is_none());
        assert!(DingTalkError::transport("x").raw_body().is_none());
    }

    #[test]
    fn only_transport_errors_are_retryable() {
        assert!(DingTalkError::transport("timeout").is_retryable());
        assert!(!DingTalkError::config("missing").is_retryable());
        assert!(!DingTalkError::Signing("bad key".to_string()).is_retryable());
        assert!(
            !DingTalkError::ResponseFormat {
                status: 200,
                body: String::new(),
                source: parse_error(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn io_error_converts_to_runtime() {
        let err: DingTalkError = std::io::Error::other("no threads").into();
        assert!(matches!(err, DingTalkError::Runtime(_)));
    }
}
