use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

use crate::verifier::WidgetMode;

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn validator_presentation_mode() -> ValueParser {
    ValueParser::from(move |mode: &str| -> std::result::Result<String, String> {
        WidgetMode::from_str(mode)
            .map(|_| mode.trim().to_string())
            .ok_or_else(|| "invalid presentation mode, expected visible or invisible".to_string())
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("presenza")
        .about("OTP challenge delivery and verifier lifecycle")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("PRESENZA_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("provider-url")
                .long("provider-url")
                .help("Identity provider base URL, example: https://id.provider.tld")
                .env("PRESENZA_PROVIDER_URL")
                .required(true),
        )
        .arg(
            Arg::new("provider-api-key")
                .long("provider-api-key")
                .help("Identity provider API key")
                .env("PRESENZA_PROVIDER_API_KEY")
                .required(true),
        )
        .arg(
            Arg::new("frontend-url")
                .long("frontend-url")
                .help("Frontend base URL allowed to call the API")
                .default_value("http://localhost:3000")
                .env("PRESENZA_FRONTEND_URL"),
        )
        .arg(
            Arg::new("container-key")
                .long("container-key")
                .help("Mount point the challenge widget renders into")
                .default_value("presenza-verifier")
                .env("PRESENZA_CONTAINER_KEY"),
        )
        .arg(
            Arg::new("presentation-mode")
                .long("presentation-mode")
                .help("Challenge widget presentation: visible or invisible")
                .default_value("invisible")
                .env("PRESENZA_PRESENTATION_MODE")
                .value_parser(validator_presentation_mode()),
        )
        .arg(
            Arg::new("bypass-verification")
                .long("bypass-verification")
                .help("Skip provider challenges entirely (local development only)")
                .env("PRESENZA_BYPASS_VERIFICATION")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("teardown-settle-ms")
                .long("teardown-settle-ms")
                .help("Pause after widget teardown before recreating, in milliseconds")
                .default_value("100")
                .env("PRESENZA_TEARDOWN_SETTLE_MS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("mount-settle-ms")
                .long("mount-settle-ms")
                .help("Pause after container creation before rendering, in milliseconds")
                .default_value("50")
                .env("PRESENZA_MOUNT_SETTLE_MS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("PRESENZA_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "presenza");
        assert_eq!(
            command
                .get_about()
                .map(ToString::to_string)
                .unwrap_or_default(),
            "OTP challenge delivery and verifier lifecycle"
        );
        assert_eq!(
            command
                .get_version()
                .map(ToString::to_string)
                .unwrap_or_default(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_check_required_args() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "presenza",
            "--port",
            "8443",
            "--provider-url",
            "https://id.provider.tld",
            "--provider-api-key",
            "key-123",
        ]);

        assert_eq!(matches.get_one::<u16>("port").copied(), Some(8443));
        assert_eq!(
            matches.get_one::<String>("provider-url").cloned(),
            Some("https://id.provider.tld".to_string())
        );
        assert_eq!(
            matches.get_one::<String>("provider-api-key").cloned(),
            Some("key-123".to_string())
        );
        assert_eq!(
            matches.get_one::<String>("presentation-mode").cloned(),
            Some("invisible".to_string())
        );
        assert!(!matches.get_flag("bypass-verification"));
        assert_eq!(
            matches.get_one::<u64>("teardown-settle-ms").copied(),
            Some(100)
        );
        assert_eq!(matches.get_one::<u64>("mount-settle-ms").copied(), Some(50));
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("PRESENZA_PROVIDER_URL", Some("https://id.provider.tld")),
                ("PRESENZA_PROVIDER_API_KEY", Some("key-from-env")),
                ("PRESENZA_PORT", Some("443")),
                ("PRESENZA_PRESENTATION_MODE", Some("visible")),
                ("PRESENZA_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["presenza"]);
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>("provider-url").cloned(),
                    Some("https://id.provider.tld".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>("presentation-mode").cloned(),
                    Some("visible".to_string())
                );
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(2));
            },
        );
    }

    #[test]
    fn test_presentation_mode_rejects_unknown() {
        let command = new();
        let result = command.try_get_matches_from(vec![
            "presenza",
            "--provider-url",
            "https://id.provider.tld",
            "--provider-api-key",
            "key",
            "--presentation-mode",
            "translucent",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars(
                [
                    ("PRESENZA_LOG_LEVEL", Some(level)),
                    ("PRESENZA_PROVIDER_URL", Some("https://id.provider.tld")),
                    ("PRESENZA_PROVIDER_API_KEY", Some("key")),
                ],
                || {
                    let command = new();
                    let matches = command.get_matches_from(vec!["presenza"]);
                    assert_eq!(
                        matches.get_one::<u8>("verbosity").copied(),
                        Some(index as u8)
                    );
                },
            );
        }
    }
}
