//! Photo streams, uploads and comments.

use axum::{
    Json,
    extract::{Extension, Multipart, Path, multipart::MultipartRejection},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{INVALID_USER_ID, UserSummary, auth::Principal, parse_id};
use crate::{
    api::error::ApiError,
    store::{Comment, NewComment, NewPhoto, Photo, Stores},
};

/// Multipart field carrying the uploaded image.
pub const UPLOAD_FIELD: &str = "uploadedphoto";
const UPLOAD_ERROR: &str = "File upload error";

static UNSAFE_FILE_NAME_CHARS: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").ok());

/// Where uploaded images are written; the same directory is served under `/images`.
#[derive(Clone, Debug)]
pub struct PhotoConfig {
    images_dir: PathBuf,
}

impl PhotoConfig {
    #[must_use]
    pub fn new(images_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
        }
    }

    #[must_use]
    pub fn images_dir(&self) -> &std::path::Path {
        &self.images_dir
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub comment: String,
    pub date_time: DateTime<Utc>,
    pub user: Option<UserSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PhotoView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub date_time: DateTime<Utc>,
    pub comments: Vec<CommentView>,
}

/// Documentation-only shape of the upload form.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    uploadedphoto: Vec<u8>,
}

#[derive(Debug, Deserialize, ToSchema, Default)]
pub struct CommentRequest {
    pub comment: Option<String>,
}

#[utoipa::path(
    get,
    path = "/photosOfUser/{id}",
    params(
        ("id" = String, Path, description = "Owner id")
    ),
    responses(
        (status = 200, description = "Photos of the user, comments with their authors.", body = [PhotoView]),
        (status = 400, description = "Invalid user ID format, or no photos found."),
        (status = 401, description = "Unauthorized"),
    ),
    tag = "photos"
)]
pub async fn photos_of_user(
    Path(id): Path<String>,
    _principal: Principal,
    stores: Extension<Stores>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_id(&id, INVALID_USER_ID)?;

    let photos = stores.photos.find_by_owner(user_id).await?;
    if photos.is_empty() {
        return Err(ApiError::validation("No photos found for this user"));
    }

    let mut author_ids: Vec<Uuid> = photos
        .iter()
        .flat_map(|photo| photo.comments.iter().map(|comment| comment.user_id))
        .collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors: HashMap<Uuid, UserSummary> = stores
        .accounts
        .summaries_by_ids(&author_ids)
        .await?
        .into_iter()
        .map(|summary| (summary.id, UserSummary::from(summary)))
        .collect();

    let views: Vec<PhotoView> = photos
        .into_iter()
        .map(|photo| photo_view(photo, &authors))
        .collect();

    Ok(Json(views))
}

fn photo_view(photo: Photo, authors: &HashMap<Uuid, UserSummary>) -> PhotoView {
    PhotoView {
        id: photo.id,
        user_id: photo.user_id,
        file_name: photo.file_name,
        date_time: photo.date_time,
        comments: photo
            .comments
            .into_iter()
            .map(|comment| comment_view(comment, authors))
            .collect(),
    }
}

fn comment_view(comment: Comment, authors: &HashMap<Uuid, UserSummary>) -> CommentView {
    CommentView {
        user: authors.get(&comment.user_id).cloned(),
        id: comment.id,
        comment: comment.comment,
        date_time: comment.date_time,
    }
}

#[utoipa::path(
    post,
    path = "/photos/new",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Photo uploaded successfully"),
        (status = 400, description = "File upload error"),
        (status = 401, description = "Unauthorized"),
    ),
    tag = "photos"
)]
#[instrument(skip_all, fields(account_id = %principal.account_id))]
pub async fn upload_photo(
    principal: Principal,
    stores: Extension<Stores>,
    photo_config: Extension<PhotoConfig>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart.map_err(|err| {
        debug!("upload rejected: {err}");
        ApiError::validation(UPLOAD_ERROR)
    })?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        debug!("malformed multipart body: {err}");
        ApiError::validation(UPLOAD_ERROR)
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let original_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|err| {
            debug!("failed to read upload: {err}");
            ApiError::validation(UPLOAD_ERROR)
        })?;
        upload = Some((original_name, bytes));
        break;
    }

    let Some((original_name, bytes)) = upload else {
        return Err(ApiError::validation(UPLOAD_ERROR));
    };

    let now = Utc::now();
    let file_name = stored_file_name(now.timestamp_millis(), &original_name);
    let path = photo_config.images_dir().join(&file_name);

    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|err| ApiError::internal("Failed to save the file", err))?;

    let created = stores
        .photos
        .create(NewPhoto {
            user_id: principal.account_id,
            file_name,
            date_time: now,
        })
        .await;

    let photo = match created {
        Ok(photo) => photo,
        Err(err) => {
            // The row is the record of the upload; drop the file with it.
            if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), "failed to remove orphaned upload: {remove_err}");
            }
            return Err(ApiError::internal("Failed to save photo in database", err));
        }
    };

    info!(photo_id = %photo.id, bytes = bytes.len(), "photo uploaded");

    Ok("Photo uploaded successfully")
}

/// `U{millis}{name}`, with the client-supplied name reduced to a safe basename.
#[must_use]
pub fn stored_file_name(timestamp_millis: i64, original_name: &str) -> String {
    let basename = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let sanitized = UNSAFE_FILE_NAME_CHARS.as_ref().map_or_else(
        String::new,
        |re| re.replace_all(basename, "_").into_owned(),
    );
    let sanitized = sanitized.trim_start_matches('.');
    format!("U{timestamp_millis}{sanitized}")
}

#[utoipa::path(
    post,
    path = "/commentsOfPhoto/{photo_id}",
    params(
        ("photo_id" = String, Path, description = "Photo id")
    ),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Comment added successfully"),
        (status = 400, description = "Comment cannot be empty, or invalid photo id."),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Photo not found"),
    ),
    tag = "photos"
)]
#[instrument(skip_all, fields(account_id = %principal.account_id))]
pub async fn add_comment(
    Path(photo_id): Path<String>,
    principal: Principal,
    stores: Extension<Stores>,
    payload: Option<Json<CommentRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = payload
        .and_then(|Json(request)| request.comment)
        .filter(|comment| !comment.trim().is_empty())
        .ok_or_else(|| ApiError::validation("Comment cannot be empty"))?;

    let photo_id = parse_id(&photo_id, "Invalid photo ID format")?;

    let added = stores
        .photos
        .add_comment(
            photo_id,
            NewComment {
                comment,
                date_time: Utc::now(),
                user_id: principal.account_id,
            },
        )
        .await?;

    match added {
        Some(comment) => {
            debug!(comment_id = %comment.id, %photo_id, "comment added");
            Ok("Comment added successfully")
        }
        None => Err(ApiError::NotFound("Photo not found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_name_prefixes_timestamp() {
        assert_eq!(
            stored_file_name(1_700_000_000_000, "kenobi1.jpg"),
            "U1700000000000kenobi1.jpg"
        );
    }

    #[test]
    fn stored_name_strips_directories_and_odd_characters() {
        assert_eq!(stored_file_name(7, "../../etc/passwd"), "U7passwd");
        assert_eq!(stored_file_name(7, r"C:\pics\my cat.png"), "U7my_cat.png");
        assert_eq!(stored_file_name(7, ".hidden"), "U7hidden");
        assert_eq!(stored_file_name(7, ""), "U7");
    }

    #[test]
    fn comment_view_resolves_author() {
        let author = UserSummary {
            id: Uuid::new_v4(),
            first_name: "Rey".to_string(),
            last_name: "Kenobi".to_string(),
        };
        let authors = HashMap::from([(author.id, author.clone())]);
        let comment = Comment {
            id: Uuid::new_v4(),
            comment: "nice".to_string(),
            date_time: Utc::now(),
            user_id: author.id,
        };
        let view = comment_view(comment, &authors);
        assert_eq!(view.user, Some(author));

        let orphan = Comment {
            id: Uuid::new_v4(),
            comment: "who?".to_string(),
            date_time: Utc::now(),
            user_id: Uuid::new_v4(),
        };
        assert!(comment_view(orphan, &authors).user.is_none());
    }
}
