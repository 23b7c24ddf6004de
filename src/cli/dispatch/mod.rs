//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to an [`Action`]. Without a subcommand the
//! server starts.

use crate::cli::actions::{Action, seed, server};
use crate::cli::commands::{
    ARG_DSN, ARG_IMAGES_DIR, ARG_MODEL, ARG_PORT, CMD_SEED, CMD_SERVER, auth,
};
use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use std::path::PathBuf;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    // Global arguments given after a subcommand only show up in its matches.
    let (name, scoped) = matches.subcommand().unwrap_or((CMD_SERVER, matches));

    let dsn = scoped
        .get_one::<String>(ARG_DSN)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --dsn")?;

    match name {
        CMD_SERVER => {
            let auth_opts = auth::Options::parse(scoped)?;
            Ok(Action::Server(server::Args {
                port: scoped.get_one::<u16>(ARG_PORT).copied().unwrap_or(3000),
                dsn,
                images_dir: images_dir(scoped),
                session_ttl_seconds: auth_opts.session_ttl_seconds,
                cookie_secure: auth_opts.cookie_secure,
            }))
        }
        CMD_SEED => Ok(Action::Seed(seed::Args {
            dsn,
            model: scoped.get_one::<String>(ARG_MODEL).map(PathBuf::from),
        })),
        other => bail!("unknown command: {other}"),
    }
}

fn images_dir(matches: &clap::ArgMatches) -> PathBuf {
    matches
        .get_one::<String>(ARG_IMAGES_DIR)
        .map_or_else(|| PathBuf::from("./images"), PathBuf::from)
}
