use axum::{Json, extract::Extension, response::IntoResponse};
use tracing::{debug, info, instrument};

use super::types::{RegisterRequest, RegisterResponse, required, required_password};
use crate::{
    api::error::ApiError,
    credential,
    store::{NewAccount, StoreError, Stores},
};

const LOGIN_NAME_TAKEN: &str = "Login name already exists";

#[utoipa::path(
    post,
    path = "/user",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Missing required fields"),
        (status = 409, description = "Login name already exists"),
    ),
    tag = "auth"
)]
#[instrument(skip(stores, payload))]
pub async fn register(
    stores: Extension<Stores>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::validation("Missing required fields"));
    };

    debug!("register: {:?}", request);

    let (Some(login_name), Some(password), Some(first_name), Some(last_name)) = (
        required(request.login_name),
        required_password(request.password),
        required(request.first_name),
        required(request.last_name),
    ) else {
        return Err(ApiError::validation("Missing required fields"));
    };

    if stores.accounts.find_by_login_name(&login_name).await?.is_some() {
        return Err(ApiError::Conflict(LOGIN_NAME_TAKEN));
    }

    let credential = credential::derive(&password)
        .map_err(|err| ApiError::internal("Internal server error", err))?;

    let account = NewAccount {
        login_name,
        first_name,
        last_name,
        location: request.location,
        description: request.description,
        occupation: request.occupation,
        credential,
    };

    // The existence check above can race; the store enforces uniqueness.
    match stores.accounts.create(account).await {
        Ok(account) => {
            info!(account_id = %account.id, "account registered");
            Ok(Json(RegisterResponse {
                login_name: account.login_name,
            }))
        }
        Err(StoreError::Conflict) => Err(ApiError::Conflict(LOGIN_NAME_TAKEN)),
        Err(err) => Err(err.into()),
    }
}
