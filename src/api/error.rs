//! Request-terminal error taxonomy shared by every handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Generic login failure. Unknown login names and wrong passwords both map here.
pub const INVALID_CREDENTIALS: &str = "Invalid login credentials";
pub const NO_ACTIVE_SESSION: &str = "no active session";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input; nothing was persisted.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    Authentication(&'static str),
    /// Missing or invalid session.
    #[error("Unauthorized")]
    Authorization,
    #[error("{0}")]
    NotFound(&'static str),
    /// Collaborator failure. `message` is returned, `source` is only logged.
    #[error("{message}: {source}")]
    Internal {
        message: &'static str,
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn internal(message: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            message,
            source: source.into(),
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Authentication(_) | Self::Authorization => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::internal("Internal server error", err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Internal { message, source } => {
                error!("{message}: {source:#}");
                (status, message).into_response()
            }
            other => (status, other.to_string()).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use axum::body::to_bytes;

    async fn body_text(response: Response) -> anyhow::Result<String> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            ApiError::validation("x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Authentication(INVALID_CREDENTIALS).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::Authorization.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(StoreError::Conflict).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn internal_errors_hide_their_source() -> anyhow::Result<()> {
        let response =
            ApiError::internal("Failed to save the file", anyhow!("disk full at /secret")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await?, "Failed to save the file");
        Ok(())
    }

    #[tokio::test]
    async fn authorization_error_body() -> anyhow::Result<()> {
        let response = ApiError::Authorization.into_response();
        assert_eq!(body_text(response).await?, "Unauthorized");
        Ok(())
    }
}
