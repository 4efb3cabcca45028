//! Webhook endpoints.
//!
//! The resource-scoped handlers are generic over the tracked entity the
//! webhooks watch and are mounted once per entity type.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use registry_core::{RegistryError, TrackedEntity, Webhook};
use serde::Deserialize;
use validator::Validate;

use super::{validated, DataResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct WebhookRequest {
    #[serde(default)]
    #[validate(url)]
    pub url: String,
    pub secret: Option<String>,
}

/// A missing target instance is reported without naming its kind.
fn resource_error(title: &'static str, err: RegistryError) -> ApiError {
    if err.is_not_found() {
        ApiError::not_found("can't find resource", "resource was not found")
    } else {
        ApiError::from_registry(title, err)
    }
}

/// GET /v1/{publishers,software}/webhooks
pub async fn list_resource_webhooks<T>(
    State(state): State<AppState>,
) -> ApiResult<Json<DataResponse<Webhook>>>
where
    T: TrackedEntity + Send + Sync + 'static,
{
    let webhooks = state
        .db()
        .list_subscriptions(T::ENTITY_TYPE)
        .map_err(|e| ApiError::from_registry("can't get Webhooks", e))?;
    Ok(DataResponse::new(webhooks))
}

/// POST /v1/{publishers,software}/webhooks
pub async fn create_resource_webhook<T>(
    State(state): State<AppState>,
    body: Result<Json<WebhookRequest>, JsonRejection>,
) -> ApiResult<Json<Webhook>>
where
    T: TrackedEntity + Send + Sync + 'static,
{
    const ERR: &str = "can't create Webhook";
    let request = validated(body, ERR)?;

    let webhook = state
        .db()
        .create_subscription(T::ENTITY_TYPE, request.url, request.secret)
        .map_err(|e| ApiError::from_registry(ERR, e))?;
    Ok(Json(webhook))
}

/// GET /v1/{publishers,software}/:id/webhooks
pub async fn list_instance_webhooks<T>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<Webhook>>>
where
    T: TrackedEntity + Send + Sync + 'static,
{
    let webhooks = state
        .db()
        .list_scoped_subscriptions(T::ENTITY_TYPE, &id)
        .map_err(|e| resource_error("can't get Webhooks", e))?;
    Ok(DataResponse::new(webhooks))
}

/// POST /v1/{publishers,software}/:id/webhooks
pub async fn create_instance_webhook<T>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<WebhookRequest>, JsonRejection>,
) -> ApiResult<Json<Webhook>>
where
    T: TrackedEntity + Send + Sync + 'static,
{
    const ERR: &str = "can't create Webhook";
    let request = validated(body, ERR)?;

    let webhook = state
        .db()
        .create_scoped_subscription(T::ENTITY_TYPE, &id, request.url, request.secret)
        .map_err(|e| resource_error(ERR, e))?;
    Ok(Json(webhook))
}

/// GET /v1/webhooks/:id
pub async fn get_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Webhook>> {
    const ERR: &str = "can't get Webhook";

    state
        .db()
        .get_subscription(&id)
        .map_err(|e| ApiError::from_registry(ERR, e))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(ERR, "Webhook was not found"))
}

/// PATCH /v1/webhooks/:id
///
/// Only the delivery URL can change.
pub async fn update_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<WebhookRequest>, JsonRejection>,
) -> ApiResult<Json<Webhook>> {
    const ERR: &str = "can't update Webhook";
    let request = validated(body, ERR)?;

    let webhook = state
        .db()
        .update_subscription_url(&id, request.url)
        .map_err(|e| ApiError::from_registry(ERR, e))?;
    Ok(Json(webhook))
}

/// DELETE /v1/webhooks/:id
pub async fn delete_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .db()
        .delete_subscription(&id)
        .map_err(|e| ApiError::from_registry("can't delete Webhook", e))?;
    Ok(StatusCode::NO_CONTENT)
}
