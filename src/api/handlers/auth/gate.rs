//! Session gate: per-request authorization policy.
//!
//! Every request is evaluated on its own: allow-listed operations pass
//! unconditionally, everything else needs an established session. The base
//! gate wraps the whole API; the strict gate (empty allow-list) additionally
//! wraps introspection and user listing.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use super::{principal::Principal, state::AuthState};
use crate::{api::error::ApiError, store::Session};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    Rejected,
}

/// An operation reachable without a session.
#[derive(Clone, Debug)]
pub struct AllowedOperation {
    method: Method,
    path: &'static str,
}

impl AllowedOperation {
    #[must_use]
    pub fn new(method: Method, path: &'static str) -> Self {
        Self { method, path }
    }

    fn matches(&self, method: &Method, path: &str) -> bool {
        self.method == method && self.path == path
    }
}

#[derive(Clone, Debug, Default)]
pub struct SessionGate {
    allow_list: Vec<AllowedOperation>,
}

impl SessionGate {
    #[must_use]
    pub fn new(allow_list: Vec<AllowedOperation>) -> Self {
        Self { allow_list }
    }

    /// Registration and login are the only operations open to anonymous clients.
    #[must_use]
    pub fn base() -> Self {
        Self::new(vec![
            AllowedOperation::new(Method::POST, "/user"),
            AllowedOperation::new(Method::POST, "/admin/login"),
        ])
    }

    /// No exceptions: every request must carry a session.
    #[must_use]
    pub fn strict() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_allow_listed(&self, method: &Method, path: &str) -> bool {
        self.allow_list.iter().any(|op| op.matches(method, path))
    }

    #[must_use]
    pub fn decide(&self, method: &Method, path: &str, session: Option<&Session>) -> GateDecision {
        if self.is_allow_listed(method, path) || session.is_some() {
            GateDecision::Allowed
        } else {
            GateDecision::Rejected
        }
    }
}

#[derive(Clone)]
pub struct GateState {
    gate: Arc<SessionGate>,
    auth: Arc<AuthState>,
}

impl GateState {
    #[must_use]
    pub fn new(gate: SessionGate, auth: Arc<AuthState>) -> Self {
        Self {
            gate: Arc::new(gate),
            auth,
        }
    }
}

/// Middleware applying a [`SessionGate`]; attaches the [`Principal`] on success.
pub async fn enforce(State(state): State<GateState>, mut request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if state.gate.is_allow_listed(&method, &path) {
        return next.run(request).await;
    }

    let session = match state.auth.authenticate(request.headers()).await {
        Ok(session) => session,
        Err(err) => return err.into_response(),
    };

    match state.gate.decide(&method, &path, session.as_ref()) {
        GateDecision::Allowed => {
            if let Some(session) = session {
                request
                    .extensions_mut()
                    .insert(Principal::from(session.identity));
            }
            next.run(request).await
        }
        GateDecision::Rejected => {
            debug!(%method, path = %path, "rejected request without session");
            ApiError::Authorization.into_response()
        }
    }
}
