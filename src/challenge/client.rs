//! User-facing challenge actions: send, verify, resend.
//!
//! No operation here retries on its own; each attempt reports exactly one
//! success or one failure and the caller decides what to do next.

use regex::Regex;
use std::sync::Arc;
use tracing::{info, warn};

use super::session::{ChallengeSession, Purpose};
use super::CODE_LENGTH;
use crate::error::Error;
use crate::provider::{IdentityProvider, ProviderError};
use crate::verifier::VerifierHandle;

pub struct ChallengeClient {
    provider: Arc<dyn IdentityProvider>,
    bypass_verification: bool,
}

impl ChallengeClient {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            bypass_verification: false,
        }
    }

    /// Local-dev escape hatch: skip the provider entirely. Injected by
    /// configuration, never derived from the environment here.
    #[must_use]
    pub fn with_bypass_verification(mut self, bypass: bool) -> Self {
        self.bypass_verification = bypass;
        self
    }

    /// True when the local-dev bypass is active; callers can skip verifier
    /// acquisition entirely.
    #[must_use]
    pub fn bypasses_verification(&self) -> bool {
        self.bypass_verification
    }

    /// Ask the provider to deliver a one-time code.
    ///
    /// Phone purposes need a live verifier handle as human-presence proof;
    /// the recovery (email) flow does not.
    ///
    /// # Errors
    /// `InvalidIdentifier` before any provider work, `VerifierNotReady` when
    /// a phone purpose has no handle, `Transient` for network failures,
    /// `SendFailed` when the provider refuses delivery.
    pub async fn send_code(
        &self,
        identifier: &str,
        purpose: Purpose,
        handle: Option<&VerifierHandle>,
    ) -> Result<ChallengeSession, Error> {
        let identifier = normalize_identifier(identifier);
        validate_identifier(&identifier, purpose)?;

        if self.bypass_verification {
            warn!(
                purpose = purpose.as_str(),
                "verification bypass enabled, skipping code delivery"
            );
            return ChallengeSession::begin(identifier, purpose);
        }

        let widget_id = if purpose.requires_presence_proof() {
            Some(
                handle
                    .ok_or(Error::VerifierNotReady)?
                    .widget_id()
                    .to_string(),
            )
        } else {
            None
        };

        self.provider
            .send_code(&identifier, purpose.challenge_kind(), widget_id.as_deref())
            .await
            .map_err(send_error)?;

        let session = ChallengeSession::begin(identifier, purpose)?;
        info!(
            challenge_id = %session.id(),
            purpose = purpose.as_str(),
            "one-time code requested"
        );
        Ok(session)
    }

    /// Confirm a submitted code with the provider.
    ///
    /// # Errors
    /// `InvalidCodeFormat` for anything but six ASCII digits (the provider is
    /// never contacted), `Transient` for network failures,
    /// `VerificationFailed` when the provider rejects the code.
    pub async fn verify_code(
        &self,
        identifier: &str,
        purpose: Purpose,
        code: &str,
    ) -> Result<(), Error> {
        if !valid_code(code) {
            return Err(Error::InvalidCodeFormat);
        }
        let identifier = normalize_identifier(identifier);

        if self.bypass_verification {
            warn!(
                purpose = purpose.as_str(),
                "verification bypass enabled, accepting code without confirmation"
            );
            return Ok(());
        }

        self.provider
            .confirm_code(&identifier, code, purpose.challenge_kind())
            .await
            .map_err(|err| match err {
                ProviderError::Network(reason) => Error::Transient(reason),
                other => Error::VerificationFailed(other.to_string()),
            })?;

        info!(purpose = purpose.as_str(), "one-time code verified");
        Ok(())
    }

    /// Re-issue the send. Same preconditions and failure modes as
    /// [`Self::send_code`]; a resend supersedes the previous code at the
    /// provider.
    ///
    /// # Errors
    /// See [`Self::send_code`].
    pub async fn resend_code(
        &self,
        identifier: &str,
        purpose: Purpose,
        handle: Option<&VerifierHandle>,
    ) -> Result<(), Error> {
        self.send_code(identifier, purpose, handle).await?;
        info!(purpose = purpose.as_str(), "one-time code resent");
        Ok(())
    }
}

/// Trim, and lowercase email identifiers for lookup consistency.
fn normalize_identifier(identifier: &str) -> String {
    let trimmed = identifier.trim();
    if trimmed.contains('@') {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}

fn validate_identifier(identifier: &str, purpose: Purpose) -> Result<(), Error> {
    let ok = match purpose {
        Purpose::Recovery => valid_email(identifier),
        Purpose::Signup | Purpose::Signin => valid_phone(identifier),
    };
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier(identifier.to_string()))
    }
}

/// Basic email format check on already-normalized input.
fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

/// E.164 phone number check.
fn valid_phone(phone: &str) -> bool {
    Regex::new(r"^\+[1-9][0-9]{7,14}$").is_ok_and(|regex| regex.is_match(phone))
}

fn valid_code(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.chars().all(|c| c.is_ascii_digit())
}

fn send_error(err: ProviderError) -> Error {
    match err {
        ProviderError::Network(reason) => Error::Transient(reason),
        other => Error::SendFailed(other.to_string()),
    }
}
