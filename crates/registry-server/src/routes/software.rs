//! Software endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use registry_core::{NewSoftware, Software, SoftwareUpdate};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use super::{validated, DataResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn validate_urls(urls: &[String]) -> Result<(), ValidationError> {
    if urls.iter().all(|u| url::Url::parse(u).is_ok()) {
        Ok(())
    } else {
        Err(ValidationError::new("url"))
    }
}

/// Request body for creating a software entry.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSoftwareRequest {
    #[serde(default)]
    #[validate(url)]
    pub url: String,
    #[serde(default)]
    #[validate(custom(function = "validate_urls"))]
    pub aliases: Vec<String>,
    #[serde(default)]
    #[validate(length(min = 1, code = "required"))]
    pub publiccode_yml: String,
    pub active: Option<bool>,
}

/// Request body for updating a software entry. Absent fields are left
/// untouched; `aliases` replaces the whole list when present.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSoftwareRequest {
    #[validate(url)]
    pub url: Option<String>,
    #[validate(custom(function = "validate_urls"))]
    pub aliases: Option<Vec<String>>,
    #[validate(length(min = 1))]
    pub publiccode_yml: Option<String>,
    pub active: Option<bool>,
}

/// GET /v1/software
pub async fn list_software(State(state): State<AppState>) -> ApiResult<Json<DataResponse<Software>>> {
    let software = state
        .db()
        .list_software()
        .map_err(|e| ApiError::from_registry("can't get Software", e))?;
    Ok(DataResponse::new(software))
}

/// GET /v1/software/:id
pub async fn get_software(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Software>> {
    const ERR: &str = "can't get Software";

    state
        .db()
        .get_software(&id)
        .map_err(|e| ApiError::from_registry(ERR, e))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(ERR, "Software was not found"))
}

/// POST /v1/software
pub async fn create_software(
    State(state): State<AppState>,
    body: Result<Json<CreateSoftwareRequest>, JsonRejection>,
) -> ApiResult<Json<Software>> {
    const ERR: &str = "can't create Software";
    let request = validated(body, ERR)?;

    let software = state
        .db()
        .create_software(NewSoftware {
            url: request.url,
            aliases: request.aliases,
            publiccode_yml: request.publiccode_yml,
            active: request.active,
        })
        .map_err(|e| ApiError::from_registry(ERR, e))?;

    Ok(Json(software))
}

/// PATCH /v1/software/:id
pub async fn update_software(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateSoftwareRequest>, JsonRejection>,
) -> ApiResult<Json<Software>> {
    const ERR: &str = "can't update Software";
    let request = validated(body, ERR)?;

    let software = state
        .db()
        .update_software(
            &id,
            SoftwareUpdate {
                url: request.url,
                aliases: request.aliases,
                publiccode_yml: request.publiccode_yml,
                active: request.active,
            },
        )
        .map_err(|e| ApiError::from_registry(ERR, e))?;

    Ok(Json(software))
}

/// DELETE /v1/software/:id
pub async fn delete_software(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .db()
        .delete_software(&id)
        .map_err(|e| ApiError::from_registry("can't delete Software", e))?;
    Ok(StatusCode::NO_CONTENT)
}
