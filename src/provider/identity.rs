//! Identity provider contract: challenge widgets, code delivery, confirmation.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The target container already holds a live widget render.
    #[error("challenge widget has already been rendered in container {0}")]
    AlreadyRendered(String),
    /// Transport-level failure talking to the provider.
    #[error("network error: {0}")]
    Network(String),
    /// The provider rejected the request with a reason of its own.
    #[error("{0}")]
    Rejected(String),
    /// A required provider field or credential is missing.
    #[error("missing provider configuration: {0}")]
    MissingConfig(String),
}

/// Provider-side challenge-type vocabulary.
///
/// Caller purposes map onto these: interactive sign-in uses the plain SMS
/// type, signup uses the dedicated signup type, and password recovery uses
/// the recovery (email) type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChallengeKind {
    Signup,
    Sms,
    Recovery,
}

impl ChallengeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Sms => "sms",
            Self::Recovery => "recovery",
        }
    }
}

/// Widget presentation size in the provider's own vocabulary.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WidgetSize {
    Normal,
    Invisible,
}

impl WidgetSize {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Invisible => "invisible",
        }
    }
}

/// Asynchronous notifications emitted by a rendered widget.
///
/// The lifecycle manager owns the receiving end and treats each firing as a
/// state-transition trigger; providers that cannot push events (e.g. the REST
/// adapter) simply drop the sender.
#[derive(Clone, Debug)]
pub enum WidgetEvent {
    Solved { token: String },
    Expired,
    Errored { message: String },
}

/// Configuration handed to the provider when creating a widget.
pub struct WidgetConfig {
    pub size: WidgetSize,
    pub events: mpsc::UnboundedSender<WidgetEvent>,
}

/// A created (but not necessarily rendered) challenge widget.
#[async_trait]
pub trait ChallengeWidget: Send + Sync {
    /// Render the widget into its container and return the provider-assigned
    /// widget id.
    async fn render(&self) -> Result<String, ProviderError>;

    /// Clear the widget. Safe to call on an already-cleared widget.
    async fn clear(&self) -> Result<(), ProviderError>;
}

/// The identity provider consumed by the verifier manager and challenge
/// client.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a widget bound to `container_id`. Rendering is a separate step.
    async fn create_verifier(
        &self,
        container_id: &str,
        config: WidgetConfig,
    ) -> Result<Arc<dyn ChallengeWidget>, ProviderError>;

    /// Ask the provider to deliver a one-time code. Phone challenge kinds
    /// carry the live widget id as human-presence proof; the recovery kind
    /// does not.
    async fn send_code(
        &self,
        identifier: &str,
        kind: ChallengeKind,
        widget_id: Option<&str>,
    ) -> Result<(), ProviderError>;

    /// Ask the provider to confirm a submitted code.
    async fn confirm_code(
        &self,
        identifier: &str,
        code: &str,
        kind: ChallengeKind,
    ) -> Result<(), ProviderError>;
}
