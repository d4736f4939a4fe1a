use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::Response, Json};
use chrono::Utc;

use crate::app::dto::{StatusResponse, WhoAmIResponse};
use crate::app::errors::{self, ApiError};
use crate::app::services::AppServices;
use crate::middleware::BearerCredential;

pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "healthy",
        message: "taskgate API is running",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    bearer: BearerCredential,
) -> Result<Json<WhoAmIResponse>, ApiError> {
    let principal = services
        .tasks
        .authenticate(bearer.as_deref(), Utc::now())
        .await?;
    Ok(Json(principal.into()))
}

pub async fn not_found() -> Response {
    errors::json_error(StatusCode::NOT_FOUND, "not_found", "resource not found")
}
