use super::handlers::{auth, health, photos, schema_info, users};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI document.
    let (_router, mut openapi) = public_router().split_for_parts();
    let (_router, gated) = api_router().split_for_parts();
    let (_router, strict) = strict_router().split_for_parts();
    openapi.merge(gated);
    openapi.merge(strict);
    openapi
}

/// Routes served without a session.
pub(crate) fn public_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi()).routes(routes!(health::health));

    let mut photoshare_tag = Tag::new("photoshare");
    photoshare_tag.description = Some("Photo sharing API".to_string());

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Registration, login and logout".to_string());

    let mut users_tag = Tag::new("users");
    users_tag.description = Some("User directory and photo usage".to_string());

    let mut photos_tag = Tag::new("photos");
    photos_tag.description = Some("Photo streams, uploads and comments".to_string());

    let mut introspection_tag = Tag::new("introspection");
    introspection_tag.description = Some("Schema info and collection counts".to_string());

    router.get_openapi_mut().tags = Some(vec![
        photoshare_tag,
        auth_tag,
        users_tag,
        photos_tag,
        introspection_tag,
    ]);

    router
}

/// Routes behind the base session gate. Registration and login are
/// allow-listed by the gate itself.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` document.
pub(crate) fn api_router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(auth::register::register))
        .routes(routes!(auth::login::login))
        .routes(routes!(auth::session::logout))
        .routes(routes!(users::get_user))
        .routes(routes!(users::photo_usage))
        .routes(routes!(photos::photos_of_user))
        .routes(routes!(photos::upload_photo))
        .routes(routes!(photos::add_comment))
}

/// Routes that additionally pass the strict gate.
pub(crate) fn strict_router() -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(users::list_users))
        .routes(routes!(schema_info::schema_info))
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    Some(value.trim()).filter(|trimmed| !trimmed.is_empty())
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|value| !value.is_empty())
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, email)) => (non_empty(name), non_empty(email.trim_end_matches('>'))),
        None => (non_empty(author), None),
    }
}
