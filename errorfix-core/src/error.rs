use thiserror::Error;

/// Every way a single fix request can end without an analysis.
///
/// Input-gating variants are raised before the completion service is
/// contacted. Upstream variants originate at or after the outbound call.
/// Display strings are safe to show to callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FixError {
    #[error("No error text provided.")]
    InputEmpty,

    #[error("Malicious content detected.")]
    InputMalicious,

    #[error("Input too short or unclear.")]
    InputNonMeaningful,

    #[error("Service unavailable.")]
    ServiceUnavailable,

    #[error("Completion service error: {0}")]
    UpstreamError(u16),

    #[error("AI stopped early or returned no text. Try shorter input.")]
    IncompleteAnswer,

    #[error("Invalid AI response.")]
    UnparsableAnswer,

    /// Carries internal detail for the logs only; rendered generically.
    #[error("Server error.")]
    UnexpectedFault(String),
}

/// Coarse grouping used by the renderer to pick a status class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    BadInput,
    Unprocessable,
    Upstream,
    Internal,
}

impl FixError {
    pub fn class(&self) -> ErrorClass {
        match self {
            FixError::InputEmpty | FixError::InputMalicious => ErrorClass::BadInput,
            FixError::InputNonMeaningful => ErrorClass::Unprocessable,
            FixError::ServiceUnavailable
            | FixError::UpstreamError(_)
            | FixError::IncompleteAnswer
            | FixError::UnparsableAnswer => ErrorClass::Upstream,
            FixError::UnexpectedFault(_) => ErrorClass::Internal,
        }
    }

    /// True for failures raised locally, before any outbound call.
    pub fn is_input_rejection(&self) -> bool {
        matches!(
            self,
            FixError::InputEmpty | FixError::InputMalicious | FixError::InputNonMeaningful
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_fault_hides_detail() {
        let err = FixError::UnexpectedFault("db pool poisoned at worker 3".to_string());
        assert_eq!(err.to_string(), "Server error.");
        assert_eq!(err.class(), ErrorClass::Internal);
    }

    #[test]
    fn upstream_status_is_reported() {
        let err = FixError::UpstreamError(503);
        assert_eq!(err.to_string(), "Completion service error: 503");
        assert!(!err.is_input_rejection());
    }

    #[test]
    fn gating_errors_are_input_rejections() {
        assert!(FixError::InputEmpty.is_input_rejection());
        assert!(FixError::InputMalicious.is_input_rejection());
        assert!(FixError::InputNonMeaningful.is_input_rejection());
        assert_eq!(FixError::InputNonMeaningful.class(), ErrorClass::Unprocessable);
    }
}
