//! External collaborators consumed by the verifier and challenge layers.
//!
//! The identity provider (widget rendering, code delivery, code confirmation)
//! and the container host (the page surface widgets mount into) are both
//! consumed through traits so the lifecycle logic stays independent of any
//! concrete SDK. `HttpIdentityProvider` talks to a REST provider;
//! `InMemoryHost` models the page's mount points.

pub mod host;
pub mod http;
mod identity;

#[cfg(test)]
pub(crate) mod testing;

pub use host::{ContainerHost, InMemoryHost};
pub use http::HttpIdentityProvider;
pub use identity::{
    ChallengeKind, ChallengeWidget, IdentityProvider, ProviderError, WidgetConfig, WidgetEvent,
    WidgetSize,
};
