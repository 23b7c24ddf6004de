use anyhow::{Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};

pub const ARG_SESSION_TTL: &str = "session-ttl";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";

/// One year; longer lifetimes overflow the database interval arithmetic.
pub const MAX_SESSION_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL)
                .long("session-ttl")
                .help("Session lifetime in seconds")
                .env("PHOTOSHARE_SESSION_TTL")
                .default_value("43200")
                .global(true)
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long("cookie-secure")
                .help("Mark the session cookie Secure (site served over HTTPS)")
                .env("PHOTOSHARE_COOKIE_SECURE")
                .global(true)
                .action(ArgAction::SetTrue),
        )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub session_ttl_seconds: i64,
    pub cookie_secure: bool,
}

impl Options {
    /// # Errors
    /// Returns an error if the session TTL is not positive or exceeds one year.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let session_ttl_seconds = matches
            .get_one::<i64>(ARG_SESSION_TTL)
            .copied()
            .unwrap_or(43_200);
        if session_ttl_seconds <= 0 {
            bail!("--{ARG_SESSION_TTL} must be a positive number of seconds");
        }
        if session_ttl_seconds > MAX_SESSION_TTL_SECONDS {
            bail!("--{ARG_SESSION_TTL} must not exceed {MAX_SESSION_TTL_SECONDS} seconds");
        }

        Ok(Self {
            session_ttl_seconds,
            cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
        })
    }
}
