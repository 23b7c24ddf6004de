//! User directory endpoints.
//!
//! Every route here runs behind the session gate; `/user/list` is additionally
//! wrapped by the strict gate.

use axum::{
    Json,
    extract::{Extension, Path},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{INVALID_USER_ID, UserSummary, auth::Principal, parse_id};
use crate::{
    api::error::ApiError,
    store::{Account, Photo, Stores},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct UserDetail {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub occupation: Option<String>,
}

impl From<Account> for UserDetail {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            first_name: account.first_name,
            last_name: account.last_name,
            location: account.location,
            description: account.description,
            occupation: account.occupation,
        }
    }
}

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct RecentPhoto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub file_name: String,
    pub date_time: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct MostCommentedPhoto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub file_name: String,
    #[serde(rename = "commentsCount")]
    pub comments_count: usize,
}

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUsage {
    pub most_recent_photo: RecentPhoto,
    pub photo_with_most_comments: MostCommentedPhoto,
}

#[utoipa::path(
    get,
    path = "/user/list",
    responses(
        (status = 200, description = "All users, summary fields only.", body = [UserSummary]),
        (status = 401, description = "Unauthorized"),
    ),
    tag = "users"
)]
#[instrument(skip_all, fields(account_id = %principal.account_id))]
pub async fn list_users(
    principal: Principal,
    stores: Extension<Stores>,
) -> Result<impl IntoResponse, ApiError> {
    let users: Vec<UserSummary> = stores
        .accounts
        .list_summaries()
        .await?
        .into_iter()
        .map(UserSummary::from)
        .collect();
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/user/{id}",
    params(
        ("id" = String, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User profile.", body = UserDetail),
        (status = 400, description = "Invalid user ID format, or user not found."),
        (status = 401, description = "Unauthorized"),
    ),
    tag = "users"
)]
pub async fn get_user(
    Path(id): Path<String>,
    _principal: Principal,
    stores: Extension<Stores>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_id(&id, INVALID_USER_ID)?;

    let Some(account) = stores.accounts.find_by_id(user_id).await? else {
        return Err(ApiError::validation("User not found"));
    };

    Ok(Json(UserDetail::from(account)))
}

#[utoipa::path(
    get,
    path = "/user/photoUsage/{id}",
    params(
        ("id" = String, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "Most recent and most commented photo.", body = PhotoUsage),
        (status = 400, description = "Invalid user ID format."),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No photos found for this user."),
    ),
    tag = "users"
)]
pub async fn photo_usage(
    Path(id): Path<String>,
    _principal: Principal,
    stores: Extension<Stores>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_id(&id, INVALID_USER_ID)?;
    let photos = stores.photos.find_by_owner(user_id).await?;

    summarize_usage(&photos)
        .map(Json)
        .ok_or(ApiError::NotFound("No photos found for this user"))
}

/// Single pass over the photos; ties keep the earlier photo.
#[must_use]
pub fn summarize_usage(photos: &[Photo]) -> Option<PhotoUsage> {
    let first = photos.first()?;
    let (recent, commented) = photos
        .iter()
        .fold((first, first), |(recent, commented), photo| {
            let recent = if photo.date_time > recent.date_time {
                photo
            } else {
                recent
            };
            let commented = if photo.comments.len() > commented.comments.len() {
                photo
            } else {
                commented
            };
            (recent, commented)
        });

    Some(PhotoUsage {
        most_recent_photo: RecentPhoto {
            id: recent.id,
            file_name: recent.file_name.clone(),
            date_time: recent.date_time,
        },
        photo_with_most_comments: MostCommentedPhoto {
            id: commented.id,
            file_name: commented.file_name.clone(),
            comments_count: commented.comments.len(),
        },
    })
}
