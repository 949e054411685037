//! Decision-assist errors

use core_kernel::PortError;
use thiserror::Error;

/// Failures from the decision-assist service
///
/// All variants are advisory-path failures: callers degrade to a fallback
/// rather than failing the business operation.
#[derive(Debug, Error)]
pub enum AssistError {
    /// The service could not be reached or refused the call
    #[error("decision-assist unavailable: {reason}")]
    Unavailable { reason: String },

    /// The call did not complete within the configured deadline
    #[error("decision-assist timed out after {duration_ms}ms during {operation}")]
    Timeout {
        operation: &'static str,
        duration_ms: u64,
    },

    /// The service answered, but not in a shape we can use
    #[error("malformed decision-assist response: {detail}")]
    MalformedResponse { detail: String },
}

impl AssistError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        AssistError::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        AssistError::MalformedResponse {
            detail: detail.into(),
        }
    }

    /// Transient failures may succeed on retry; malformed output will not
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AssistError::Unavailable { .. } | AssistError::Timeout { .. }
        )
    }
}

impl From<AssistError> for PortError {
    fn from(err: AssistError) -> Self {
        match err {
            AssistError::Unavailable { reason } => PortError::ServiceUnavailable { service: reason },
            AssistError::Timeout {
                operation,
                duration_ms,
            } => PortError::Timeout {
                operation: operation.to_string(),
                duration_ms,
            },
            AssistError::MalformedResponse { detail } => PortError::Transformation { message: detail },
        }
    }
}
