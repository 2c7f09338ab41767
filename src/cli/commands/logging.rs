use clap::{builder::ValueParser, Arg, ArgAction, Command};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

// Position is the verbosity count `AUTHN_CONTEXT_LOG_LEVEL` maps to.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Tracing level for a verbosity count; `None` keeps the default (errors).
#[must_use]
pub const fn level(verbosity: u8) -> Option<Level> {
    match verbosity {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

fn parse_verbosity(raw: &str) -> Result<u8, String> {
    let raw = raw.trim().to_ascii_lowercase();
    let position = match raw.parse::<usize>() {
        Ok(count) => (count < LEVEL_NAMES.len()).then_some(count),
        Err(_) => LEVEL_NAMES.iter().position(|name| *name == raw),
    };
    position
        .and_then(|count| u8::try_from(count).ok())
        .ok_or_else(|| format!("invalid log level {raw}, expected one of {LEVEL_NAMES:?}"))
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(parse_verbosity)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log verbosity, repeat for more: -v warn, -vv info, -vvv debug, -vvvv trace")
            .env("AUTHN_CONTEXT_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_accepts_names_and_counts() {
        assert_eq!(parse_verbosity("DEBUG"), Ok(3));
        assert_eq!(parse_verbosity("2"), Ok(2));
        assert!(parse_verbosity("5").is_err());
        assert!(parse_verbosity("loud").is_err());
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level(0), None);
        assert_eq!(level(1), Some(Level::WARN));
        assert_eq!(level(3), Some(Level::DEBUG));
        assert_eq!(level(9), Some(Level::TRACE));
    }
}
