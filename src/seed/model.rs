//! Bundled model data: users, their photos and the comments on them.
//!
//! Identifiers in the model are opaque strings that only link records to one
//! another; the stores assign real ids on load.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;

const BUNDLED: &str = include_str!("model_data.json");

#[derive(Debug, Clone, Deserialize)]
pub struct ModelUser {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
}

impl ModelUser {
    /// Seeded accounts log in with their lowercased last name.
    #[must_use]
    pub fn login_name(&self) -> String {
        self.last_name.to_lowercase()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelComment {
    pub user_id: String,
    pub date_time: DateTime<Utc>,
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelPhoto {
    pub user_id: String,
    pub file_name: String,
    pub date_time: DateTime<Utc>,
    #[serde(default)]
    pub comments: Vec<ModelComment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelData {
    pub users: Vec<ModelUser>,
    #[serde(default)]
    pub photos: Vec<ModelPhoto>,
}

impl ModelData {
    /// The model data compiled into the binary.
    ///
    /// # Errors
    /// Returns an error if the bundled JSON is inconsistent.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED).context("bundled model data is invalid")
    }

    /// Parse and validate model data.
    ///
    /// # Errors
    /// Returns an error on malformed JSON, duplicate user ids or login names,
    /// or references to unknown users.
    pub fn from_json(raw: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(raw).context("failed to parse model data")?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        let mut login_names = HashSet::new();
        for user in &self.users {
            if !ids.insert(user.id.as_str()) {
                bail!("duplicate user id in model data: {}", user.id);
            }
            if !login_names.insert(user.login_name()) {
                bail!("duplicate login name in model data: {}", user.login_name());
            }
        }

        for photo in &self.photos {
            if !ids.contains(photo.user_id.as_str()) {
                bail!("photo {} references unknown user {}", photo.file_name, photo.user_id);
            }
            if let Some(comment) = photo
                .comments
                .iter()
                .find(|comment| !ids.contains(comment.user_id.as_str()))
            {
                bail!(
                    "comment on {} references unknown user {}",
                    photo.file_name,
                    comment.user_id
                );
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn comment_count(&self) -> usize {
        self.photos.iter().map(|photo| photo.comments.len()).sum()
    }
}
