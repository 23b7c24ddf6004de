use crate::cli::{actions::Action, commands, dispatch, telemetry};
use anyhow::Result;

/// Map verbosity count to tracing level
const fn get_verbosity_level(verbosity: u8) -> Option<tracing::Level> {
    match verbosity {
        0 => None,
        1 => Some(tracing::Level::WARN),
        2 => Some(tracing::Level::INFO),
        3 => Some(tracing::Level::DEBUG),
        _ => Some(tracing::Level::TRACE),
    }
}

/// Highest of the `-v` count and `--log-level`, read at the top level and,
/// when given after it, on the subcommand.
fn verbosity(matches: &clap::ArgMatches) -> u8 {
    let level = |matches: &clap::ArgMatches| {
        let count = matches
            .get_one::<u8>(commands::logging::ARG_VERBOSITY)
            .copied()
            .unwrap_or(0);
        let named = matches
            .get_one::<u8>(commands::logging::ARG_LOG_LEVEL)
            .copied()
            .unwrap_or(0);
        count.max(named)
    };
    let scoped = matches.subcommand().map_or(0, |(_, sub)| level(sub));
    level(matches).max(scoped)
}

/// Main entry point for the CLI - builds and returns the Action
///
/// # Errors
///
/// Returns an error if argument parsing, telemetry initialization, or action dispatch fails
pub fn start() -> Result<Action> {
    // 1. Parse command-line arguments
    let matches = commands::new().get_matches();

    // 2. Initialize telemetry
    telemetry::init(get_verbosity_level(verbosity(&matches)))?;

    // 3. Dispatch to appropriate action
    dispatch::handler(&matches)
}
