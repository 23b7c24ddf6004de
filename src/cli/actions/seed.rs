use crate::{
    seed::{self, ModelData},
    store::{PgStore, Stores},
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub dsn: SecretString,
    pub model: Option<PathBuf>,
}

/// Execute the seed action.
/// # Errors
/// Returns an error if the model data cannot be read or any write fails.
pub async fn execute(args: Args) -> Result<()> {
    let model = match &args.model {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read model data: {}", path.display()))?;
            ModelData::from_json(&raw)?
        }
        None => ModelData::bundled()?,
    };

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(args.dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    PgStore::new(pool.clone())
        .ensure_schema()
        .await
        .context("Failed to apply database schema")?;

    let report = seed::load(&Stores::postgres(pool), &model).await?;

    info!(
        users = report.users,
        photos = report.photos,
        comments = report.comments,
        version = %report.version,
        "model data loaded"
    );
    println!(
        "Loaded {} users, {} photos, {} comments (schema {})",
        report.users, report.photos, report.comments, report.version
    );

    Ok(())
}
