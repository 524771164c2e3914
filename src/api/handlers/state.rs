//! OTP endpoint state and configuration.

use std::sync::Arc;

use super::rate_limit::RateLimiter;
use crate::challenge::ChallengeClient;
use crate::verifier::{VerifierManager, WidgetMode};

const DEFAULT_CONTAINER_KEY: &str = "presenza-verifier";

#[derive(Clone, Debug)]
pub struct OtpConfig {
    frontend_base_url: String,
    container_key: String,
    presentation_mode: WidgetMode,
}

impl OtpConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            container_key: DEFAULT_CONTAINER_KEY.to_string(),
            presentation_mode: WidgetMode::Invisible,
        }
    }

    #[must_use]
    pub fn with_container_key(mut self, container_key: String) -> Self {
        self.container_key = container_key;
        self
    }

    #[must_use]
    pub fn with_presentation_mode(mut self, mode: WidgetMode) -> Self {
        self.presentation_mode = mode;
        self
    }

    #[must_use]
    pub fn container_key(&self) -> &str {
        &self.container_key
    }

    #[must_use]
    pub fn presentation_mode(&self) -> WidgetMode {
        self.presentation_mode
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }
}

pub struct OtpState {
    config: OtpConfig,
    manager: Arc<VerifierManager>,
    client: ChallengeClient,
    rate_limiter: Arc<dyn RateLimiter>,
}

impl OtpState {
    pub fn new(
        config: OtpConfig,
        manager: Arc<VerifierManager>,
        client: ChallengeClient,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            config,
            manager,
            client,
            rate_limiter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    #[must_use]
    pub fn manager(&self) -> &VerifierManager {
        &self.manager
    }

    #[must_use]
    pub fn client(&self) -> &ChallengeClient {
        &self.client
    }

    pub(super) fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }
}
