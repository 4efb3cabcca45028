//! Route definitions for the REST API.

mod logs;
mod publishers;
mod software;
mod status;
mod webhooks;

use axum::{
    extract::rejection::JsonRejection,
    routing::get,
    Json, Router,
};
use registry_core::{Publisher, Software};
use serde::Serialize;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Collection response body.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: Vec<T>,
}

impl<T> DataResponse<T> {
    pub fn new(data: Vec<T>) -> Json<Self> {
        Json(Self { data })
    }
}

/// Decode and validate a JSON body, labelling failures with `title`.
pub(crate) fn validated<T: Validate>(
    body: Result<Json<T>, JsonRejection>,
    title: &'static str,
) -> ApiResult<T> {
    let Json(request) = body.map_err(|rejection| ApiError::invalid_json(title, rejection))?;
    request
        .validate()
        .map_err(|errors| ApiError::validation(title, &errors))?;
    Ok(request)
}

/// Create the `/v1` router.
pub fn create_router(state: AppState) -> Router {
    let v1 = Router::new()
        // Status
        .route("/status", get(status::get_status))
        // Publisher webhooks
        .route(
            "/publishers/webhooks",
            get(webhooks::list_resource_webhooks::<Publisher>)
                .post(webhooks::create_resource_webhook::<Publisher>),
        )
        .route(
            "/publishers/:id/webhooks",
            get(webhooks::list_instance_webhooks::<Publisher>)
                .post(webhooks::create_instance_webhook::<Publisher>),
        )
        // Publishers
        .route(
            "/publishers",
            get(publishers::list_publishers).post(publishers::create_publisher),
        )
        .route(
            "/publishers/:id",
            get(publishers::get_publisher)
                .patch(publishers::update_publisher)
                .delete(publishers::delete_publisher),
        )
        // Software webhooks
        .route(
            "/software/webhooks",
            get(webhooks::list_resource_webhooks::<Software>)
                .post(webhooks::create_resource_webhook::<Software>),
        )
        .route(
            "/software/:id/webhooks",
            get(webhooks::list_instance_webhooks::<Software>)
                .post(webhooks::create_instance_webhook::<Software>),
        )
        // Software
        .route(
            "/software",
            get(software::list_software).post(software::create_software),
        )
        .route(
            "/software/:id",
            get(software::get_software)
                .patch(software::update_software)
                .delete(software::delete_software),
        )
        // Logs
        .route("/logs", get(logs::list_logs).post(logs::create_log))
        .route(
            "/logs/:id",
            get(logs::get_log)
                .patch(logs::update_log)
                .delete(logs::delete_log),
        )
        .route(
            "/software/:id/logs",
            get(logs::list_software_logs).post(logs::create_software_log),
        )
        // Webhooks
        .route(
            "/webhooks/:id",
            get(webhooks::get_webhook)
                .patch(webhooks::update_webhook)
                .delete(webhooks::delete_webhook),
        );

    Router::new().nest("/v1", v1).with_state(state)
}
