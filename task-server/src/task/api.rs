use crate::task::validation::{validate_new_task, validate_task_changes};
use crate::task::{NewTask, Task, TaskService, normalize_title};
use crate::web::error::ApiError;
use crate::web::response::{ErrorEnvelope, send_ok, send_success};
use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::Response,
    routing::get,
};
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone, Debug)]
pub struct TaskState {
    pub db: Arc<sea_orm::DatabaseConnection>,
}

/// Body accepted by POST /tasks.
#[derive(Debug, ToSchema)]
pub struct CreateTaskRequest {
    /// Non-empty title; stored trimmed and lower-cased
    pub title: String,
    pub color: String,
    /// Defaults to `false`
    pub completed: Option<bool>,
}

/// Body accepted by PUT/PATCH /tasks/{id}. Every field is optional.
#[derive(Debug, ToSchema)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub color: Option<String>,
    pub completed: Option<bool>,
}

/// Fetches a task or fails with the handler-level "Task not found" error.
async fn require_task(service: &TaskService<'_>, id: i32) -> Result<Task, ApiError> {
    service
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

/// Handler for GET /tasks - Returns every task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks",
    responses(
        (status = 200, description = "Successfully retrieved tasks; `data` holds the list", body = [Task]),
        (status = 500, description = "Storage failure", body = ErrorEnvelope)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(State(state): State<Arc<TaskState>>) -> Result<Response, ApiError> {
    let service = TaskService::new(&state.db);
    let tasks = service.list_all().await?;
    tracing::info!("Retrieved {} tasks", tasks.len());
    Ok(send_ok(tasks, "Tasks retrieved successfully"))
}

/// Handler for GET /tasks/{id} - Returns a single task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks/{id}",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task found; `data` holds the task", body = Task),
        (status = 400, description = "Malformed ID", body = ErrorEnvelope),
        (status = 404, description = "Task not found", body = ErrorEnvelope)
    ),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<Arc<TaskState>>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;
    let service = TaskService::new(&state.db);
    let task = require_task(&service, id).await?;
    Ok(send_ok(task, "Task retrieved successfully"))
}

/// Handler for POST /tasks - Creates a task with a unique normalized title.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created; `data` holds the task", body = Task),
        (status = 400, description = "Validation failed or title already taken", body = ErrorEnvelope),
        (status = 500, description = "Storage failure", body = ErrorEnvelope)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let new_task = validate_new_task(&input)?;
    let title = normalize_title(&new_task.title);

    let service = TaskService::new(&state.db);
    // The unique index still guards concurrent creates; this only gives the
    // common case a friendlier message.
    if service.find_by_title(&title).await?.is_some() {
        return Err(ApiError::Duplicate(
            "Task with this title already exists".to_string(),
        ));
    }

    let task = service.create(NewTask { title, ..new_task }).await?;
    tracing::info!("Created task {}", task.id());
    Ok(send_success(
        task,
        "Task created successfully",
        StatusCode::CREATED,
    ))
}

/// Handler for PUT/PATCH /tasks/{id} - Applies a partial update.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    put,
    path = "/tasks/{id}",
    params(("id" = i32, Path, description = "Task ID")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated; `data` holds the task", body = Task),
        (status = 400, description = "Validation failed or title already taken", body = ErrorEnvelope),
        (status = 404, description = "Task not found", body = ErrorEnvelope),
        (status = 500, description = "Storage failure", body = ErrorEnvelope)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;
    let service = TaskService::new(&state.db);
    require_task(&service, id).await?;

    let Json(input) = payload?;
    let mut changes = validate_task_changes(&input)?;
    changes.title = changes.title.as_deref().map(normalize_title);

    let task = service.update(id, changes).await?;
    tracing::info!("Updated task {}", task.id());
    Ok(send_ok(task, "Task updated successfully"))
}

/// Handler for DELETE /tasks/{id} - Deletes a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task deleted; `data` is null"),
        (status = 404, description = "Task not found", body = ErrorEnvelope),
        (status = 500, description = "Storage failure", body = ErrorEnvelope)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;
    let service = TaskService::new(&state.db);
    require_task(&service, id).await?;

    service.delete(id).await?;
    tracing::info!("Deleted task {}", id);
    Ok(send_ok((), "Task deleted successfully"))
}

/// Creates and returns the tasks router.
pub fn create_task_router(state: TaskState) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route(
            "/tasks/{id}",
            get(get_task_handler)
                .put(update_task_handler)
                .patch(update_task_handler)
                .delete(delete_task_handler),
        )
        .with_state(Arc::new(state))
}
