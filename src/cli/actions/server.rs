use crate::api::{
    self,
    handlers::{auth::AuthConfig, photos::PhotoConfig},
};
use anyhow::Result;
use secrecy::SecretString;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub images_dir: PathBuf,
    pub session_ttl_seconds: i64,
    pub cookie_secure: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    info!(
        port = args.port,
        images_dir = %args.images_dir.display(),
        session_ttl_seconds = args.session_ttl_seconds,
        cookie_secure = args.cookie_secure,
        "starting photoshare"
    );

    let auth_config = AuthConfig::new()
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_session_cookie_secure(args.cookie_secure);

    api::new(
        args.port,
        args.dsn,
        auth_config,
        PhotoConfig::new(args.images_dir),
    )
    .await
}
