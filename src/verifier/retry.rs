//! Failure classification for widget create/render errors.

use crate::provider::ProviderError;

/// What a failure demands: a user-facing retry, a forced teardown, or
/// neither.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureClass {
    /// Eligible for caller-initiated retry after a state reset.
    Transient,
    /// A widget is already live in the target container. Force cleanup and
    /// tell the caller to refresh; never auto-retry.
    Conflict,
    /// Broken configuration. Retrying cannot help.
    Fatal,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RetryPolicy;

impl RetryPolicy {
    #[must_use]
    pub fn classify(self, err: &ProviderError) -> FailureClass {
        match err {
            ProviderError::AlreadyRendered(_) => FailureClass::Conflict,
            ProviderError::MissingConfig(_) => FailureClass::Fatal,
            ProviderError::Network(_) => FailureClass::Transient,
            // Some providers only report the conflict as message text.
            ProviderError::Rejected(message) => {
                if is_conflict_message(message) {
                    FailureClass::Conflict
                } else {
                    FailureClass::Transient
                }
            }
        }
    }
}

fn is_conflict_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("already been rendered") || message.contains("already rendered")
}
