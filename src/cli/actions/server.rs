use crate::{
    api::{self, OtpConfig, OtpState},
    challenge::ChallengeClient,
    cli::telemetry,
    provider::{ContainerHost, HttpIdentityProvider, IdentityProvider, InMemoryHost},
    verifier::{ManagerConfig, VerifierManager, WidgetMode},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::warn;

use crate::api::handlers::NoopRateLimiter;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub provider_url: String,
    pub provider_api_key: SecretString,
    pub frontend_base_url: String,
    pub container_key: String,
    pub presentation_mode: WidgetMode,
    pub bypass_verification: bool,
    pub teardown_settle_ms: u64,
    pub mount_settle_ms: u64,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the provider adapter cannot be built or the server
/// fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let provider = HttpIdentityProvider::new(&args.provider_url, args.provider_api_key)
        .context("Invalid identity provider configuration")?;
    let provider: Arc<dyn IdentityProvider> = Arc::new(provider);
    let host: Arc<dyn ContainerHost> = Arc::new(InMemoryHost::new());

    let manager_config = ManagerConfig::new()
        .with_teardown_settle_ms(args.teardown_settle_ms)
        .with_mount_settle_ms(args.mount_settle_ms);
    let manager = Arc::new(VerifierManager::new(
        Arc::clone(&provider),
        host,
        manager_config,
    ));

    if args.bypass_verification {
        warn!("verification bypass is enabled; no challenge will reach the provider");
    }
    let client =
        ChallengeClient::new(provider).with_bypass_verification(args.bypass_verification);

    let config = OtpConfig::new(args.frontend_base_url)
        .with_container_key(args.container_key)
        .with_presentation_mode(args.presentation_mode);

    let state = Arc::new(OtpState::new(
        config,
        manager,
        client,
        Arc::new(NoopRateLimiter),
    ));

    let result = api::serve(args.port, state).await;
    telemetry::shutdown_tracer();
    result
}
