//! # Presenza (OTP Challenge Orchestration)
//!
//! `presenza` drives phone and email one-time-code flows against an external
//! identity provider. Its core is the challenge-widget lifecycle: a singleton
//! verifier (the human-presence proof the provider demands before sending an
//! SMS code) that is created on demand, reused while healthy, and torn down
//! and rebuilt on expiry, widget error, or render conflict.
//!
//! ## Lifecycle
//!
//! - At most one live widget exists process-wide; a single-slot async lock
//!   guarantees one render in flight and lets concurrent callers share the
//!   settled outcome.
//! - Teardown is idempotent and never fails; settle delays keep the
//!   provider's own asynchronous teardown ordered before recreation.
//! - A render conflict ("widget already rendered") force-cleans state and
//!   surfaces a refresh-and-retry error rather than retrying silently.
//!
//! ## Challenges
//!
//! Send, verify, and resend operate per attempt with no automatic retries.
//! Phone purposes (`signup`, `signin`) require a live verifier handle; the
//! email `recovery` flow does not. Codes are always six digits and malformed
//! codes are rejected locally, before the provider is contacted.
//!
//! Presentation mode and the local-dev verification bypass are injected
//! configuration, never derived from the runtime environment.

pub mod api;
pub mod challenge;
pub mod cli;
pub mod error;
pub mod provider;
pub mod verifier;

pub use error::Error;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
