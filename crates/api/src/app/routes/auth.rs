use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use taskgate_auth::{StoreError, UserAccount};
use taskgate_core::text::normalize_email;

use crate::app::dto::{CredentialsRequest, MessageResponse, TokenResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let Json(body) = body?;
    let now = Utc::now();

    let account = UserAccount::register(&body.email, &body.password, now)?;
    let account = services
        .accounts
        .insert(account)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => ApiError::EmailTaken,
            other => other.into(),
        })?;

    let issued = services.codec.issue(account.id, services.token_ttl, now)?;
    tracing::info!(principal_id = %account.id, "account registered");
    Ok((StatusCode::CREATED, Json(TokenResponse::new(issued, &account))))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(body) = body?;

    let account = match services.accounts.find_by_email(&normalize_email(&body.email)).await? {
        Some(account) if account.verify_password(&body.password) => account,
        _ => return Err(ApiError::BadLogin),
    };

    let issued = services.codec.issue(account.id, services.token_ttl, Utc::now())?;
    Ok(Json(TokenResponse::new(issued, &account)))
}

/// Credentials are stateless; the client discards its token.
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "logged out; discard the access token",
    })
}
