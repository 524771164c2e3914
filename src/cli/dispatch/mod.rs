//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the
//! appropriate action, such as starting the API server with its full
//! configuration state.

use crate::cli::actions::{server::Args, Action};
use crate::verifier::WidgetMode;
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let provider_url = matches
        .get_one::<String>("provider-url")
        .cloned()
        .context("missing required argument: --provider-url")?;
    let provider_api_key = matches
        .get_one::<String>("provider-api-key")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --provider-api-key")?;

    let frontend_base_url = matches
        .get_one::<String>("frontend-url")
        .cloned()
        .unwrap_or_else(|| "http://localhost:3000".to_string());
    let container_key = matches
        .get_one::<String>("container-key")
        .cloned()
        .unwrap_or_else(|| "presenza-verifier".to_string());

    let presentation_mode = matches
        .get_one::<String>("presentation-mode")
        .map_or(Some(WidgetMode::Invisible), |mode| {
            WidgetMode::from_str(mode)
        })
        .ok_or_else(|| anyhow!("invalid presentation mode"))?;

    let bypass_verification = matches.get_flag("bypass-verification");
    let teardown_settle_ms = matches
        .get_one::<u64>("teardown-settle-ms")
        .copied()
        .unwrap_or(100);
    let mount_settle_ms = matches
        .get_one::<u64>("mount-settle-ms")
        .copied()
        .unwrap_or(50);

    Ok(Action::Server(Args {
        port,
        provider_url,
        provider_api_key,
        frontend_base_url,
        container_key,
        presentation_mode,
        bypass_verification,
        teardown_settle_ms,
        mount_settle_ms,
    }))
}
