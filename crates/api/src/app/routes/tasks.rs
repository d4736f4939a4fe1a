use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use taskgate_auth::Operation;
use taskgate_core::{NewTask, TaskId, TaskPatch};

use crate::app::dto::{CreateTaskRequest, TaskListResponse, TaskResponse, UpdateTaskRequest};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::middleware::BearerCredential;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/:id", get(get_task).put(update_task).delete(delete_task))
}

/// An unparseable id addresses nothing; the pipeline denies it as not found
/// once the caller has authenticated.
fn parse_task_id(raw: &str) -> Option<TaskId> {
    raw.parse().ok()
}

pub async fn list_tasks(
    Extension(services): Extension<Arc<AppServices>>,
    bearer: BearerCredential,
) -> Result<Json<TaskListResponse>, ApiError> {
    let ctx = services
        .tasks
        .authorize(bearer.as_deref(), Operation::List, None, Utc::now())
        .await?;
    let tasks = services.tasks.gate().list(&ctx).await?;
    Ok(Json(tasks.into()))
}

pub async fn create_task(
    Extension(services): Extension<Arc<AppServices>>,
    bearer: BearerCredential,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let ctx = services
        .tasks
        .authorize(bearer.as_deref(), Operation::Create, None, Utc::now())
        .await?;
    let Json(body) = body?;
    let draft = NewTask::new(&body.title, body.description.as_deref())?;

    let task = services.tasks.gate().create(&ctx, draft).await?;
    tracing::info!(task_id = %task.id, principal_id = %ctx.principal().id, "task created");
    Ok((StatusCode::CREATED, Json(task.into())))
}

pub async fn get_task(
    Extension(services): Extension<Arc<AppServices>>,
    bearer: BearerCredential,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    let id = parse_task_id(&id);
    let ctx = services
        .tasks
        .authorize(bearer.as_deref(), Operation::Read, id.as_ref(), Utc::now())
        .await?;
    let task = services.tasks.gate().read(ctx)?;
    Ok(Json(task.into()))
}

pub async fn update_task(
    Extension(services): Extension<Arc<AppServices>>,
    bearer: BearerCredential,
    Path(id): Path<String>,
    body: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<TaskResponse>, ApiError> {
    let id = parse_task_id(&id);
    let ctx = services
        .tasks
        .authorize(bearer.as_deref(), Operation::Update, id.as_ref(), Utc::now())
        .await?;
    let Json(body) = body?;
    let patch = TaskPatch::new(
        body.title.as_deref(),
        body.description.as_deref(),
        body.is_completed,
    )?;

    let task = services.tasks.gate().update(&ctx, patch).await?;
    Ok(Json(task.into()))
}

pub async fn delete_task(
    Extension(services): Extension<Arc<AppServices>>,
    bearer: BearerCredential,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_task_id(&id);
    let ctx = services
        .tasks
        .authorize(bearer.as_deref(), Operation::Delete, id.as_ref(), Utc::now())
        .await?;
    services.tasks.gate().delete(&ctx).await?;
    tracing::info!(principal_id = %ctx.principal().id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}
