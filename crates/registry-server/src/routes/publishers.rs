//! Publisher endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use registry_core::{CodeHosting, NewPublisher, Publisher, PublisherUpdate};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{validated, DataResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CodeHostingRequest {
    #[validate(url)]
    pub url: String,
    pub group: Option<bool>,
}

impl From<CodeHostingRequest> for CodeHosting {
    fn from(request: CodeHostingRequest) -> Self {
        Self {
            url: request.url,
            group: request.group.unwrap_or(true),
        }
    }
}

/// Request body for creating a publisher.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePublisherRequest {
    #[serde(default)]
    #[validate(length(min = 1, code = "required"), nested)]
    pub code_hosting: Vec<CodeHostingRequest>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    #[validate(email)]
    pub email: String,
    pub active: Option<bool>,
    #[validate(length(min = 1, max = 255))]
    pub alternative_id: Option<String>,
}

/// Request body for updating a publisher. Absent fields are left untouched.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePublisherRequest {
    #[validate(length(min = 1), nested)]
    pub code_hosting: Option<Vec<CodeHostingRequest>>,
    pub description: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub active: Option<bool>,
    #[validate(length(max = 255))]
    pub alternative_id: Option<String>,
}

/// GET /v1/publishers
pub async fn list_publishers(
    State(state): State<AppState>,
) -> ApiResult<Json<DataResponse<Publisher>>> {
    let publishers = state
        .db()
        .list_publishers()
        .map_err(|e| ApiError::from_registry("can't get Publishers", e))?;
    Ok(DataResponse::new(publishers))
}

/// GET /v1/publishers/:id
///
/// `id` may also be the publisher's alternative id.
pub async fn get_publisher(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Publisher>> {
    const ERR: &str = "can't get Publisher";

    state
        .db()
        .get_publisher(&id)
        .map_err(|e| ApiError::from_registry(ERR, e))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(ERR, "Publisher was not found"))
}

/// POST /v1/publishers
pub async fn create_publisher(
    State(state): State<AppState>,
    body: Result<Json<CreatePublisherRequest>, JsonRejection>,
) -> ApiResult<Json<Publisher>> {
    const ERR: &str = "can't create Publisher";
    let request = validated(body, ERR)?;

    let publisher = state
        .db()
        .create_publisher(NewPublisher {
            email: request.email,
            description: request.description,
            alternative_id: request.alternative_id,
            active: request.active,
            code_hosting: request.code_hosting.into_iter().map(Into::into).collect(),
        })
        .map_err(|e| ApiError::from_registry(ERR, e))?;

    Ok(Json(publisher))
}

/// PATCH /v1/publishers/:id
pub async fn update_publisher(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdatePublisherRequest>, JsonRejection>,
) -> ApiResult<Json<Publisher>> {
    const ERR: &str = "can't update Publisher";
    let request = validated(body, ERR)?;

    let publisher = state
        .db()
        .update_publisher(
            &id,
            PublisherUpdate {
                email: request.email,
                description: request.description,
                alternative_id: request.alternative_id,
                active: request.active,
                code_hosting: request
                    .code_hosting
                    .map(|hosting| hosting.into_iter().map(Into::into).collect()),
            },
        )
        .map_err(|e| ApiError::from_registry(ERR, e))?;

    Ok(Json(publisher))
}

/// DELETE /v1/publishers/:id
pub async fn delete_publisher(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .db()
        .delete_publisher(&id)
        .map_err(|e| ApiError::from_registry("can't delete Publisher", e))?;
    Ok(StatusCode::NO_CONTENT)
}
