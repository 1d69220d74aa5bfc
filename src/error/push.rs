use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error as ThisError;

use super::IsRetryable;

/// Code reported when a send loses the race against the delivery timeout.
pub const TIMEOUT_CODE: &str = "messaging/timeout";
const NETWORK_CODE: &str = "app/network-error";
const CREDENTIAL_CODE: &str = "app/invalid-credential";
const INTERNAL_CODE: &str = "app/internal-error";

/// Failure of a single push send.
#[derive(Debug, ThisError)]
pub enum PushError {
    /// The provider answered and refused the message.
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },

    #[error("send did not settle within {0:?}")]
    Timeout(Duration),

    #[error("HTTP request error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("access token unavailable: {0}")]
    Credential(String),

    /// Access token endpoint answered with a non-success status.
    #[error("token endpoint returned {0}")]
    TokenStatus(StatusCode),

    #[error("send task failed: {0}")]
    Internal(String),
}

impl PushError {
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        PushError::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Machine-readable code, in the `messaging/*` family for provider rejections.
    pub fn code(&self) -> &str {
        match self {
            PushError::Rejected { code, .. } => code,
            PushError::Timeout(_) => TIMEOUT_CODE,
            PushError::Network(_) => NETWORK_CODE,
            PushError::Credential(_) | PushError::TokenStatus(_) => CREDENTIAL_CODE,
            PushError::Internal(_) => INTERNAL_CODE,
        }
    }

    /// True when the provider has confirmed the token will never accept a delivery again.
    pub fn is_dead_token(&self) -> bool {
        is_dead_token_code(self.code())
    }
}

pub fn is_dead_token_code(code: &str) -> bool {
    code.contains("not-registered") || code.contains("invalid-registration-token")
}

impl IsRetryable for PushError {
    fn is_retryable(&self) -> bool {
        match self {
            PushError::Network(_) => true,
            PushError::TokenStatus(status) => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_token_codes() {
        assert!(PushError::rejected("messaging/registration-token-not-registered", "").is_dead_token());
        assert!(PushError::rejected("messaging/invalid-registration-token", "").is_dead_token());
        assert!(!PushError::rejected("messaging/invalid-argument", "").is_dead_token());
        assert!(!PushError::rejected("messaging/server-unavailable", "").is_dead_token());
    }

    #[test]
    fn timeout_is_transient() {
        let err = PushError::Timeout(Duration::from_millis(5000));
        assert_eq!(err.code(), TIMEOUT_CODE);
        assert!(!err.is_dead_token());
    }
}
