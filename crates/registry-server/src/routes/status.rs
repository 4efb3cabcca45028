//! Status endpoint.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::AppState;

/// Report whether the API can reach its database.
/// GET /v1/status
pub async fn get_status(State(state): State<AppState>) -> Response {
    let cache_control = [(header::CACHE_CONTROL, "no-cache")];

    match state.db().ping() {
        Ok(()) => (StatusCode::NO_CONTENT, cache_control).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Database ping failed");
            (
                cache_control,
                ApiError::internal("can't connect to database"),
            )
                .into_response()
        }
    }
}
