use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateTaskRequest, UpdateTaskRequest},
    query::{TaskListParams, TaskQuery},
    repo_types::{StarToggle, Task, TaskPatch},
};
use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser},
    error::{ApiError, ApiResult},
    extract::{AppJson, AppPath, AppQuery},
    rate_limit::rate_gate,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks))
        .route("/tasks/:id", get(get_task))
}

/// Mutating routes, each guarded by the shared rate limiter.
pub fn write_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/tasks", post(create_task))
        .route("/tasks/:id", put(update_task).delete(delete_task))
        .route("/tasks/:id/toggle-star", put(toggle_star).patch(toggle_star))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_gate))
}

const TASK_NOT_FOUND: ApiError = ApiError::NotFound("Task not found");

#[instrument(skip(state, claims))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    AppQuery(params): AppQuery<TaskListParams>,
) -> ApiResult<Json<Vec<Task>>> {
    let query = TaskQuery::try_from(params)?;
    let tasks = state.tasks.list(claims.user_id, &query).await?;
    info!(
        user_id = claims.user_id,
        page = query.page,
        page_size = query.page_size,
        count = tasks.len(),
        "tasks listed"
    );
    Ok(Json(tasks))
}

#[instrument(skip(state, claims))]
pub async fn get_task(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = state
        .tasks
        .find(claims.user_id, id)
        .await?
        .ok_or(TASK_NOT_FOUND)?;
    Ok(Json(task))
}

#[instrument(skip(state, claims, body))]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    AppJson(body): AppJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    if body.name.trim().is_empty() {
        warn!(user_id = claims.user_id, "task without name");
        return Err(ApiError::BadRequest("Task name must not be empty".into()));
    }

    let task = Task::new(claims.user_id, body.name, body.details);
    state.tasks.insert(&task).await?;

    info!(user_id = claims.user_id, task_id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

#[instrument(skip(state, claims, body))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let patch = TaskPatch::try_from(body)?;
    let task = state
        .tasks
        .update(claims.user_id, id, &patch)
        .await?
        .ok_or(TASK_NOT_FOUND)?;

    info!(user_id = claims.user_id, task_id = %task.id, "task updated");
    Ok(Json(task))
}

#[instrument(skip(state, claims))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    if !state.tasks.delete(claims.user_id, id).await? {
        return Err(TASK_NOT_FOUND);
    }

    info!(user_id = claims.user_id, task_id = %id, "task deleted");
    Ok(Json(MessageResponse::new("Task deleted")))
}

#[instrument(skip(state, claims))]
pub async fn toggle_star(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Json<StarToggle>> {
    let toggled = state
        .tasks
        .toggle_star(claims.user_id, id)
        .await?
        .ok_or(TASK_NOT_FOUND)?;

    info!(
        user_id = claims.user_id,
        task_id = %id,
        have_star = toggled.have_star,
        "task star toggled"
    );
    Ok(Json(toggled))
}
