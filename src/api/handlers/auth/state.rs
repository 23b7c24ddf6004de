//! Auth configuration and session lifecycle.

use axum::http::HeaderMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::session::extract_session_token;
use crate::{
    api::error::{ApiError, NO_ACTIVE_SESSION},
    store::{Identity, Session, SessionStore},
};

const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_ttl_seconds: i64,
    session_cookie_secure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            session_cookie_secure: false,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    /// Mark the cookie `Secure` when the site is served over HTTPS.
    #[must_use]
    pub fn with_session_cookie_secure(mut self, secure: bool) -> Self {
        self.session_cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.session_cookie_secure
    }
}

/// Session lifecycle over an injected [`SessionStore`].
pub struct AuthState {
    config: AuthConfig,
    sessions: Arc<dyn SessionStore>,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, sessions: Arc<dyn SessionStore>) -> Self {
        Self { config, sessions }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Establish a session bound to `identity` and return the client token.
    ///
    /// # Errors
    /// Returns an internal error if the session store fails.
    pub async fn on_login_success(&self, identity: &Identity) -> Result<String, ApiError> {
        let token = self
            .sessions
            .establish(identity, self.config.session_ttl_seconds)
            .await?;
        info!(account_id = %identity.account_id, "session established");
        Ok(token)
    }

    /// Destroy the session behind `token`.
    ///
    /// # Errors
    /// Returns an authentication error when there is no active session for the
    /// token, or an internal error if the session store fails.
    pub async fn on_logout(&self, token: Option<&str>) -> Result<(), ApiError> {
        let Some(token) = token else {
            return Err(ApiError::Authentication(NO_ACTIVE_SESSION));
        };
        if self.sessions.destroy(token).await? {
            debug!("session destroyed");
            Ok(())
        } else {
            Err(ApiError::Authentication(NO_ACTIVE_SESSION))
        }
    }

    /// Resolve the session presented with a request, if any.
    ///
    /// # Errors
    /// Returns an internal error if the session store fails.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Option<Session>, ApiError> {
        let Some(token) = extract_session_token(headers) else {
            return Ok(None);
        };
        Ok(self.sessions.lookup(&token).await?)
    }
}
