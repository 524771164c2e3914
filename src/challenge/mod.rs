//! Challenge delivery and confirmation: send, verify, and resend one-time
//! codes against the identity provider.

pub mod client;
pub mod session;

pub use client::ChallengeClient;
pub use session::{ChallengeSession, Purpose};

/// One-time codes are always six ASCII digits.
pub const CODE_LENGTH: usize = 6;
