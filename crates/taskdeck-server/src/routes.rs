use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use taskdeck_core::{ServiceError, TaskService};
use taskdeck_shared::{CreateTaskRequest, HealthDto, Task, UpdateTaskRequest};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/tasks", get(tasks_list).post(task_create))
        .route(
            "/api/tasks/{id}",
            get(task_get).put(task_update).delete(task_delete),
        )
        .with_state(state)
}

/// Router plus the CORS and request tracing layers used when serving.
pub fn app(state: AppState, cors_origins: &[String]) -> anyhow::Result<Router> {
    Ok(router(state)
        .layer(cors_layer(cors_origins)?)
        .layer(TraceLayer::new_for_http()))
}

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|err| anyhow::anyhow!("invalid CORS origin {origin:?}: {err}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}

fn task_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    path.map(|Path(id)| id).map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected task id");
        ApiError::BadRequest("Invalid task id".to_string())
    })
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected request body");
        ApiError::BadRequest(rejection.body_text())
    })
}

/// Runs a mutating service call on the blocking pool; it holds the lock
/// across a file write and rename.
async fn blocking<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&TaskService) -> Result<T, ServiceError> + Send + 'static,
{
    let tasks = Arc::clone(&state.tasks);
    tokio::task::spawn_blocking(move || op(&tasks))
        .await
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("task service call failed: {err}")))?
        .map_err(ApiError::from)
}

#[instrument(skip(state))]
async fn health(State(state): State<AppState>) -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".to_string(),
        tasks: state.tasks.len(),
    })
}

#[instrument(skip(state))]
async fn tasks_list(State(state): State<AppState>) -> Json<Vec<Task>> {
    let tasks = state.tasks.list();
    info!(count = tasks.len(), "tasks_list served");
    Json(tasks)
}

#[instrument(skip(state, path))]
async fn task_get(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Task>, ApiError> {
    let id = task_id(path)?;
    state.tasks.get(id).map(Json).ok_or(ApiError::NotFound)
}

#[instrument(skip(state, body))]
async fn task_create(
    State(state): State<AppState>,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = json_body(body)?;
    let task = blocking(&state, move |tasks| tasks.create(request.description)).await?;
    let location = format!("/api/tasks/{}", task.id);

    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(task)).into_response())
}

#[instrument(skip(state, path, body))]
async fn task_update(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let id = task_id(path)?;
    let request = json_body(body)?;

    blocking(&state, move |tasks| {
        tasks.update(id, request.description, request.is_completed)
    })
    .await?
    .map(Json)
    .ok_or(ApiError::NotFound)
}

#[instrument(skip(state, path))]
async fn task_delete(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = task_id(path)?;
    if blocking(&state, move |tasks| tasks.delete(id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
