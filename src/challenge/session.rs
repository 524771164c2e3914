//! Pending-challenge bookkeeping for callers.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use utoipa::ToSchema;
use uuid::Uuid;

use super::CODE_LENGTH;
use crate::error::Error;
use crate::provider::ChallengeKind;

/// Flow context for a challenge.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Signup,
    Signin,
    Recovery,
}

impl Purpose {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Signin => "signin",
            Self::Recovery => "recovery",
        }
    }

    #[must_use]
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "signup" => Some(Self::Signup),
            "signin" => Some(Self::Signin),
            "recovery" => Some(Self::Recovery),
            _ => None,
        }
    }

    /// Phone purposes need a live verifier handle; the email recovery flow
    /// does not.
    #[must_use]
    pub fn requires_presence_proof(self) -> bool {
        !matches!(self, Self::Recovery)
    }

    /// Map onto the provider's challenge-type vocabulary.
    pub(crate) fn challenge_kind(self) -> ChallengeKind {
        match self {
            Self::Signup => ChallengeKind::Signup,
            Self::Signin => ChallengeKind::Sms,
            Self::Recovery => ChallengeKind::Recovery,
        }
    }
}

/// Marker for a successfully requested code. UI state only, never a security
/// token; a resend logically supersedes it at the provider.
#[derive(Clone, Debug)]
pub struct ChallengeSession {
    id: Uuid,
    identifier: String,
    purpose: Purpose,
    code_length: usize,
    issued_at: SystemTime,
    marker: String,
}

impl ChallengeSession {
    pub(crate) fn begin(identifier: String, purpose: Purpose) -> Result<Self, Error> {
        Ok(Self {
            // Time-ordered so log correlation sorts by issuance.
            id: Uuid::now_v7(),
            identifier,
            purpose,
            code_length: CODE_LENGTH,
            issued_at: SystemTime::now(),
            marker: new_marker()?,
        })
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    #[must_use]
    pub fn purpose(&self) -> Purpose {
        self.purpose
    }

    #[must_use]
    pub fn code_length(&self) -> usize {
        self.code_length
    }

    #[must_use]
    pub fn issued_at(&self) -> SystemTime {
        self.issued_at
    }

    /// Seconds since the Unix epoch, for wire responses.
    #[must_use]
    pub fn issued_at_unix(&self) -> u64 {
        self.issued_at
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs())
    }

    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }
}

/// Random URL-safe marker. The raw value only travels back to the caller's
/// UI state.
fn new_marker() -> Result<String, Error> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| Error::Transient(format!("failed to generate session marker: {err}")))?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::{new_marker, ChallengeSession, Purpose};
    use crate::provider::ChallengeKind;

    #[test]
    fn purpose_round_trips() {
        for purpose in [Purpose::Signup, Purpose::Signin, Purpose::Recovery] {
            assert_eq!(Purpose::from_str(purpose.as_str()), Some(purpose));
        }
        assert_eq!(Purpose::from_str("mfa"), None);
    }

    #[test]
    fn purpose_maps_to_provider_vocabulary() {
        assert_eq!(Purpose::Signup.challenge_kind(), ChallengeKind::Signup);
        assert_eq!(Purpose::Signin.challenge_kind(), ChallengeKind::Sms);
        assert_eq!(Purpose::Recovery.challenge_kind(), ChallengeKind::Recovery);
    }

    #[test]
    fn only_recovery_skips_presence_proof() {
        assert!(Purpose::Signup.requires_presence_proof());
        assert!(Purpose::Signin.requires_presence_proof());
        assert!(!Purpose::Recovery.requires_presence_proof());
    }

    #[test]
    fn sessions_carry_a_fixed_code_length_and_unique_markers() {
        let first = ChallengeSession::begin("+911234567890".to_string(), Purpose::Signin).unwrap();
        let second = ChallengeSession::begin("+911234567890".to_string(), Purpose::Signin).unwrap();

        assert_eq!(first.code_length(), 6);
        assert_ne!(first.marker(), second.marker());
        assert_ne!(first.id(), second.id());
        assert!(first.issued_at_unix() > 0);
    }

    #[test]
    fn markers_are_url_safe() {
        let marker = new_marker().unwrap();
        assert!(!marker.is_empty());
        assert!(marker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
