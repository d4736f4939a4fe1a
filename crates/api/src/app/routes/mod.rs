use axum::{routing::get, Router};

pub mod auth;
pub mod system;
pub mod tasks;

/// Router for every endpoint except the health checks.
///
/// Authorization is not a layer here: each protected handler runs the
/// pipeline itself, because the decision depends on the addressed resource.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/auth", auth::router())
        .nest("/tasks", tasks::router())
}
