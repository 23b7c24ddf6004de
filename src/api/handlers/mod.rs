//! API handlers and shared utilities for photoshare.
//!
//! Handlers receive their collaborators through `Extension` layers: the
//! [`Stores`](crate::store::Stores) bundle, the shared
//! [`AuthState`](auth::AuthState) and, for uploads, the
//! [`PhotoConfig`](photos::PhotoConfig).

pub mod auth;
pub mod health;
pub mod photos;
pub mod schema_info;
pub mod users;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::ApiError;
use crate::store::AccountSummary;

pub const INVALID_USER_ID: &str = "Invalid user ID format";

/// Parse a path identifier; malformed values are a 400 rather than a routing miss.
pub(crate) fn parse_id(raw: &str, message: &'static str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::validation(message))
}

/// `{_id, first_name, last_name}` as listed and embedded in comments.
#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

impl From<AccountSummary> for UserSummary {
    fn from(summary: AccountSummary) -> Self {
        Self {
            id: summary.id,
            first_name: summary.first_name,
            last_name: summary.last_name,
        }
    }
}
