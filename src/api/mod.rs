use crate::store::{PgStore, Stores};
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    middleware,
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, services::ServeDir, set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use utoipa_axum::router::OpenApiRouter;

pub mod error;
pub mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use openapi::openapi;

use handlers::{
    auth::{AuthConfig, AuthState, GateState, SessionGate, gate::enforce},
    photos::PhotoConfig,
};

// Uploads are buffered in memory before they hit the images directory.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Build the gated API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Assemble the full application.
///
/// `/health` and `/images` are public. Everything else passes the base session
/// gate; `/user/list` and `/test/{p1}` also pass the strict gate.
pub fn app(stores: Stores, auth_state: Arc<AuthState>, photo_config: PhotoConfig) -> Router {
    let (public, _openapi) = openapi::public_router().split_for_parts();
    let (gated, _openapi) = router().split_for_parts();
    let (strict, _openapi) = openapi::strict_router().split_for_parts();

    let strict = strict.route_layer(middleware::from_fn_with_state(
        GateState::new(SessionGate::strict(), auth_state.clone()),
        enforce,
    ));

    let gated = gated
        .merge(strict)
        .layer(middleware::from_fn_with_state(
            GateState::new(SessionGate::base(), auth_state.clone()),
            enforce,
        ))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    public
        .nest_service("/images", ServeDir::new(photo_config.images_dir()))
        .merge(gated)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(auth_state))
                .layer(Extension(photo_config))
                .layer(Extension(stores)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: SecretString,
    auth_config: AuthConfig,
    photo_config: PhotoConfig,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    PgStore::new(pool.clone())
        .ensure_schema()
        .await
        .context("Failed to apply database schema")?;

    tokio::fs::create_dir_all(photo_config.images_dir())
        .await
        .with_context(|| {
            format!(
                "Failed to create images directory: {}",
                photo_config.images_dir().display()
            )
        })?;

    let stores = Stores::postgres(pool);
    let auth_state = Arc::new(AuthState::new(auth_config, stores.sessions.clone()));

    let app = app(stores, auth_state, photo_config);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
