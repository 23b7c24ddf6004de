use axum::{
    Json,
    extract::{Extension, Path},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::Principal;
use crate::{
    api::error::ApiError,
    store::{SchemaInfo, Stores},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct SchemaInfoView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub version: String,
    pub load_date_time: DateTime<Utc>,
}

impl From<SchemaInfo> for SchemaInfoView {
    fn from(info: SchemaInfo) -> Self {
        Self {
            id: info.id,
            version: info.version,
            load_date_time: info.load_date_time,
        }
    }
}

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Counts {
    pub user: i64,
    pub photo: i64,
    pub schema_info: i64,
}

#[utoipa::path(
    get,
    path = "/test/{p1}",
    params(
        ("p1" = String, Path, description = "`info` or `counts`")
    ),
    responses(
        (status = 200, description = "Schema info record or collection counts."),
        (status = 400, description = "Bad param"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Missing SchemaInfo"),
    ),
    tag = "introspection"
)]
pub async fn schema_info(
    Path(p1): Path<String>,
    _principal: Principal,
    stores: Extension<Stores>,
) -> Result<Response, ApiError> {
    match p1.as_str() {
        "info" => {
            let info = stores.schema.info().await?.ok_or_else(|| {
                ApiError::internal(
                    "Missing SchemaInfo",
                    anyhow::anyhow!("schema_info table is empty"),
                )
            })?;
            Ok(Json(SchemaInfoView::from(info)).into_response())
        }
        "counts" => {
            let (user, photo, schema_info) = tokio::try_join!(
                stores.accounts.count(),
                stores.photos.count(),
                stores.schema.count(),
            )?;
            Ok(Json(Counts {
                user,
                photo,
                schema_info,
            })
            .into_response())
        }
        other => Err(ApiError::validation(format!("Bad param {other}"))),
    }
}
