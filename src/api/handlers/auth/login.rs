use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, header::SET_COOKIE},
    response::IntoResponse,
};
use std::{hint::black_box, sync::Arc};
use tracing::{debug, instrument};

use super::{
    session::session_cookie,
    state::AuthState,
    types::{LoginRequest, LoginResponse, required, required_password},
};
use crate::{
    api::error::{ApiError, INVALID_CREDENTIALS},
    credential,
    store::Stores,
};

// Digest of nothing in particular; verified against when the login name is
// unknown so both failure paths do the same work.
const DECOY_HASH: &str = "0000000000000000000000000000000000000000";
const DECOY_SALT: &str = "0000000000000000";

#[utoipa::path(
    post,
    path = "/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session established; cookie set", body = LoginResponse),
        (status = 400, description = "Missing login name or password"),
        (status = 401, description = "Invalid login credentials"),
    ),
    tag = "auth"
)]
#[instrument(skip(stores, auth_state, payload))]
pub async fn login(
    stores: Extension<Stores>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::validation("Missing login name or password"));
    };

    let (Some(login_name), Some(password)) =
        (required(request.login_name), required_password(request.password))
    else {
        return Err(ApiError::validation("Missing login name or password"));
    };

    let account = stores.accounts.find_by_login_name(&login_name).await?;

    let Some(account) = account else {
        black_box(credential::verify(
            black_box(DECOY_HASH),
            DECOY_SALT,
            &password,
        ));
        debug!("login failed");
        return Err(ApiError::Authentication(INVALID_CREDENTIALS));
    };

    if !account.credential.matches(&password) {
        debug!("login failed");
        return Err(ApiError::Authentication(INVALID_CREDENTIALS));
    }

    let token = auth_state.on_login_success(&account.identity()).await?;

    let mut headers = HeaderMap::new();
    let cookie = session_cookie(auth_state.config(), &token)
        .map_err(|err| ApiError::internal("Internal server error", err))?;
    headers.insert(SET_COOKIE, cookie);

    Ok((
        headers,
        Json(LoginResponse {
            id: account.id,
            first_name: account.first_name,
        }),
    ))
}
