//! Database seeding.
//!
//! Replaces every account, photo, comment, session and schema-info record
//! with the model data. Seeded accounts share one password so the data set is
//! usable right away; their credentials still go through the regular codec.

mod model;

pub use model::{ModelComment, ModelData, ModelPhoto, ModelUser};

use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    credential,
    store::{NewAccount, NewComment, NewPhoto, Stores},
};

pub const SEED_PASSWORD: &str = "weak";
pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub photos: usize,
    pub comments: usize,
    pub version: String,
}

/// Clear the stores and load `model`.
///
/// # Errors
/// Returns an error if any store operation or credential derivation fails.
pub async fn load(stores: &Stores, model: &ModelData) -> Result<SeedReport> {
    stores.photos.clear().await.context("failed to clear photos")?;
    stores
        .accounts
        .clear()
        .await
        .context("failed to clear accounts")?;
    stores
        .schema
        .clear()
        .await
        .context("failed to clear schema info")?;

    let mut ids: HashMap<&str, Uuid> = HashMap::with_capacity(model.users.len());
    for user in &model.users {
        let account = stores
            .accounts
            .create(NewAccount {
                login_name: user.login_name(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                location: user.location.clone(),
                description: user.description.clone(),
                occupation: user.occupation.clone(),
                credential: credential::derive(SEED_PASSWORD)?,
            })
            .await
            .with_context(|| format!("failed to create user {}", user.login_name()))?;
        debug!(account_id = %account.id, login_name = %account.login_name, "added user");
        ids.insert(user.id.as_str(), account.id);
    }

    let mut comments = 0;
    for photo in &model.photos {
        let owner = resolve(&ids, &photo.user_id)?;
        let created = stores
            .photos
            .create(NewPhoto {
                user_id: owner,
                file_name: photo.file_name.clone(),
                date_time: photo.date_time,
            })
            .await
            .with_context(|| format!("failed to create photo {}", photo.file_name))?;

        for comment in &photo.comments {
            let added = stores
                .photos
                .add_comment(
                    created.id,
                    NewComment {
                        comment: comment.comment.clone(),
                        date_time: comment.date_time,
                        user_id: resolve(&ids, &comment.user_id)?,
                    },
                )
                .await?;
            if added.is_some() {
                comments += 1;
            }
        }
        debug!(photo_id = %created.id, file_name = %created.file_name, "added photo");
    }

    let info = stores
        .schema
        .create(SCHEMA_VERSION)
        .await
        .context("failed to create schema info")?;
    info!(version = %info.version, "schema info created");

    Ok(SeedReport {
        users: ids.len(),
        photos: model.photos.len(),
        comments,
        version: info.version,
    })
}

fn resolve(ids: &HashMap<&str, Uuid>, model_id: &str) -> Result<Uuid> {
    ids.get(model_id)
        .copied()
        .with_context(|| format!("unknown user in model data: {model_id}"))
}
