//! Crate-wide error taxonomy for challenge and verifier operations.
//!
//! Provider failures never escape raw: every internal provider call is caught,
//! classified, and re-surfaced as one of these variants.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A phone challenge was requested but no live verifier handle exists.
    #[error("verifier is not ready")]
    VerifierNotReady,
    /// The provider reports a widget already rendered in the target container.
    /// State has been force-cleaned; the caller must refresh and retry.
    #[error("challenge widget already rendered; refresh and retry")]
    Conflict,
    /// Expiry or a network-level failure. Retry-eligible via `force_refresh`.
    #[error("transient challenge failure: {0}")]
    Transient(String),
    /// Missing or invalid provider configuration. Not retryable.
    #[error("provider configuration error: {0}")]
    Configuration(String),
    /// The submitted code is not exactly six ASCII digits.
    #[error("code must be exactly {expected} digits", expected = crate::challenge::CODE_LENGTH)]
    InvalidCodeFormat,
    /// The identifier is not a plausible email address or E.164 phone number.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// The provider refused to deliver the code.
    #[error("challenge delivery failed: {0}")]
    SendFailed(String),
    /// The provider rejected the submitted code (wrong or expired).
    #[error("verification failed: {0}")]
    VerificationFailed(String),
}

impl Error {
    /// True for failures the caller may retry after a `force_refresh`.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::SendFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn display_names_the_expected_code_length() {
        assert_eq!(
            Error::InvalidCodeFormat.to_string(),
            "code must be exactly 6 digits"
        );
    }

    #[test]
    fn retryable_covers_transient_and_send_failures() {
        assert!(Error::Transient("timeout".to_string()).is_retryable());
        assert!(Error::SendFailed("sms queue full".to_string()).is_retryable());
        assert!(!Error::Conflict.is_retryable());
        assert!(!Error::Configuration("missing api key".to_string()).is_retryable());
        assert!(!Error::InvalidCodeFormat.is_retryable());
    }
}
