//! Log endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use registry_core::Log;
use serde::Deserialize;
use validator::Validate;

use super::{validated, DataResponse};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LogRequest {
    #[serde(default)]
    #[validate(length(min = 2))]
    pub message: String,
}

/// GET /v1/logs
pub async fn list_logs(State(state): State<AppState>) -> ApiResult<Json<DataResponse<Log>>> {
    let logs = state
        .db()
        .list_logs()
        .map_err(|e| ApiError::from_registry("can't get Logs", e))?;
    Ok(DataResponse::new(logs))
}

/// GET /v1/logs/:id
pub async fn get_log(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Log>> {
    const ERR: &str = "can't get Log";

    state
        .db()
        .get_log(&id)
        .map_err(|e| ApiError::from_registry(ERR, e))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(ERR, "Log was not found"))
}

/// POST /v1/logs
pub async fn create_log(
    State(state): State<AppState>,
    body: Result<Json<LogRequest>, JsonRejection>,
) -> ApiResult<Json<Log>> {
    const ERR: &str = "can't create Log";
    let request = validated(body, ERR)?;

    let log = state
        .db()
        .create_log(request.message)
        .map_err(|e| ApiError::from_registry(ERR, e))?;
    Ok(Json(log))
}

/// PATCH /v1/logs/:id
pub async fn update_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<LogRequest>, JsonRejection>,
) -> ApiResult<Json<Log>> {
    const ERR: &str = "can't update Log";
    let request = validated(body, ERR)?;

    let log = state
        .db()
        .update_log(&id, request.message)
        .map_err(|e| ApiError::from_registry(ERR, e))?;
    Ok(Json(log))
}

/// DELETE /v1/logs/:id
pub async fn delete_log(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state
        .db()
        .delete_log(&id)
        .map_err(|e| ApiError::from_registry("can't delete Log", e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/software/:id/logs
pub async fn list_software_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<Log>>> {
    let logs = state
        .db()
        .list_software_logs(&id)
        .map_err(|e| ApiError::from_registry("can't get Software Logs", e))?;
    Ok(DataResponse::new(logs))
}

/// POST /v1/software/:id/logs
pub async fn create_software_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<LogRequest>, JsonRejection>,
) -> ApiResult<Json<Log>> {
    const ERR: &str = "can't create Log";
    let request = validated(body, ERR)?;

    let log = state
        .db()
        .create_software_log(&id, request.message)
        .map_err(|e| ApiError::from_registry(ERR, e))?;
    Ok(Json(log))
}
