//! Authenticated principal extraction.
//!
//! The session gate resolves the request's session and stores a [`Principal`]
//! in the request extensions. Handlers that act on behalf of a user take a
//! `Principal` argument, which rejects with 401 when no session was attached,
//! so the requirement is declared in the handler signature itself.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::{api::error::ApiError, store::Identity};

/// Authenticated user context derived from the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub account_id: Uuid,
    pub first_name: String,
}

impl From<Identity> for Principal {
    fn from(identity: Identity) -> Self {
        Self {
            account_id: identity.account_id,
            first_name: identity.first_name,
        }
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(ApiError::Authorization)
    }
}
