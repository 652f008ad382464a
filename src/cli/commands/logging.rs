use clap::{builder::ValueParser, Arg, ArgMatches, Command};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

// Index is the `-v` count; the filter defaults to ERROR below WARN.
const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accepts a level name or its `-v` count from `CAMBIGO_LOG_LEVEL`.
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(|value: &str| -> Result<u8, String> {
        let value = value.trim().to_lowercase();
        LEVELS
            .iter()
            .position(|name| *name == value)
            .and_then(|index| u8::try_from(index).ok())
            .or_else(|| value.parse::<u8>().ok().filter(|count| *count < 5))
            .ok_or_else(|| format!("invalid log level, expected one of {}", LEVELS.join(", ")))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Gate log verbosity: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("CAMBIGO_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

/// Level requested on the command line, `None` when the default applies.
#[must_use]
pub fn level(matches: &ArgMatches) -> Option<Level> {
    match matches.get_one::<u8>(ARG_VERBOSITY).copied().unwrap_or(0) {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}
