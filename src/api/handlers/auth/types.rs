//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Registration payload. Required fields are optional here so a missing field
/// yields a 400 with a stable message instead of a JSON rejection.
#[derive(ToSchema, Deserialize, Default)]
pub struct RegisterRequest {
    pub login_name: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub occupation: Option<String>,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("login_name", &self.login_name)
            .field("password", &"***")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("location", &self.location)
            .field("description", &self.description)
            .field("occupation", &self.occupation)
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterResponse {
    pub login_name: String,
}

#[derive(ToSchema, Deserialize, Default)]
pub struct LoginRequest {
    pub login_name: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("login_name", &self.login_name)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub first_name: String,
}

/// Treat absent and blank values alike.
pub(super) fn required(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Passwords are taken verbatim; only an absent or empty value is missing.
pub(super) fn required_password(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
