//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store, codec and pipeline wiring
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use taskgate_auth::{AuditLog, StoreError, TracingAuditLog};

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> Result<Router, StoreError> {
    build_app_with_audit(config, Arc::new(TracingAuditLog)).await
}

/// Same as [`build_app`], recording denials on `audit`.
pub async fn build_app_with_audit(
    config: &ApiConfig,
    audit: Arc<dyn AuditLog>,
) -> Result<Router, StoreError> {
    let services = Arc::new(services::build_services(config, audit).await?);

    Ok(Router::new()
        .route("/", get(routes::system::health))
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .fallback(routes::system::not_found)
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(create_cors_layer(config))
                .layer(axum::middleware::from_fn(middleware::request_logging)),
        ))
}

/// Creates the CORS layer from configuration.
///
/// Listed origins may send credentials; `*` allows any origin without them.
fn create_cors_layer(config: &ApiConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(600));

    if config.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}
