use crate::task::repository::{ListOptions, TaskRepositoryError};
use crate::task::{MAX_TEXT_LENGTH, Task, TaskContent, TaskState, TaskStatus};
use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// JSON representation of a task, used for both requests and responses.
///
/// Dates travel as `YYYY-MM-DD` strings and the status as its integer code.
/// On input the `id` is ignored; every other field is validated by
/// [`TaskJson::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson {
    /// Store-assigned identifier
    #[serde(default)]
    pub id: i32,
    /// What needs to be done
    #[serde(default)]
    #[schema(example = "Buy milk")]
    pub text: String,
    /// Day the task was created
    #[schema(example = "2024-01-01")]
    pub created_date: Option<NaiveDate>,
    /// Day the task is expected to be done
    #[schema(example = "2024-01-02")]
    pub expected_date: Option<NaiveDate>,
    /// 0 = in progress, 1 = completed, 2 = testing, 3 = returned
    #[serde(default)]
    #[schema(example = 0)]
    pub status: i32,
}

impl TaskJson {
    /// Turns the payload into task content, failing on the first rule it breaks.
    pub fn validate(self) -> Result<TaskContent, TaskApiError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(TaskApiError::EmptyText);
        }
        if text.chars().count() > MAX_TEXT_LENGTH {
            return Err(TaskApiError::TextTooLong);
        }
        if let (Some(created_date), Some(expected_date)) = (self.created_date, self.expected_date) {
            if expected_date < created_date {
                return Err(TaskApiError::ExpectedBeforeCreated);
            }
        }
        let status = TaskStatus::try_from(self.status).map_err(TaskApiError::InvalidStatus)?;
        let created_date = self.created_date.ok_or(TaskApiError::MissingCreatedDate)?;
        let expected_date = self
            .expected_date
            .ok_or(TaskApiError::MissingExpectedDate)?;

        Ok(TaskContent::new(
            text.to_string(),
            created_date,
            expected_date,
            status,
        ))
    }
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id(),
            text: task.text().to_string(),
            created_date: Some(task.created_date()),
            expected_date: Some(task.expected_date()),
            status: task.status().code(),
        }
    }
}

/// JSON response for API errors
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error category
    #[schema(example = "VALIDATION_ERROR")]
    pub error: String,
    /// Human-readable description
    #[schema(example = "text cannot be empty")]
    pub message: String,
}

/// Query parameters accepted by the task listing.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    /// Only return tasks with this status code
    status: Option<String>,
    /// `desc` for descending order, anything else for ascending
    sort: Option<String>,
    /// One of `id`, `text`, `createdDate`, `expectedDate`, `status`
    #[serde(rename = "sortField")]
    sort_field: Option<String>,
}

impl From<TaskListQuery> for ListOptions {
    fn from(query: TaskListQuery) -> Self {
        Self {
            status_filter: query.status,
            sort_order: query.sort,
            sort_field: query.sort_field,
        }
    }
}

/// Query parameter identifying a single task.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskIdQuery {
    /// Task ID
    id: Option<String>,
}

impl TaskIdQuery {
    fn task_id(&self) -> Result<i32, TaskApiError> {
        self.id
            .as_deref()
            .and_then(|id| id.parse().ok())
            .ok_or(TaskApiError::InvalidId)
    }
}

/// Error type for task API handlers.
#[derive(Debug, thiserror::Error)]
pub enum TaskApiError {
    #[error("text cannot be empty")]
    EmptyText,
    #[error("text cannot exceed {} characters", MAX_TEXT_LENGTH)]
    TextTooLong,
    #[error("expected date cannot be earlier than created date")]
    ExpectedBeforeCreated,
    #[error("invalid task status: {0}")]
    InvalidStatus(i32),
    #[error("created date is required")]
    MissingCreatedDate,
    #[error("expected date is required")]
    MissingExpectedDate,
    #[error("invalid task ID")]
    InvalidId,
    #[error("invalid request payload: {0}")]
    MalformedPayload(String),
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
}

impl From<JsonRejection> for TaskApiError {
    fn from(rejection: JsonRejection) -> Self {
        TaskApiError::MalformedPayload(rejection.body_text())
    }
}

impl TaskApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            TaskApiError::Repository(TaskRepositoryError::TaskNotFound(_)) => StatusCode::NOT_FOUND,
            TaskApiError::Repository(
                TaskRepositoryError::InvalidSortField(_)
                | TaskRepositoryError::InvalidStatusFilter(_),
            ) => StatusCode::BAD_REQUEST,
            TaskApiError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for TaskApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error = match status_code {
            StatusCode::NOT_FOUND => "NOT_FOUND",
            StatusCode::BAD_REQUEST => "VALIDATION_ERROR",
            _ => "INTERNAL_ERROR",
        };
        if status_code.is_server_error() {
            tracing::error!("Task request failed: {}", self);
        } else {
            tracing::warn!("Task request rejected: {}", self);
        }

        let body = ErrorResponse {
            error: error.to_string(),
            message: self.to_string(),
        };
        (status_code, Json(body)).into_response()
    }
}

/// Handler for GET /api/tasks - Lists tasks with optional filtering and sorting.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks",
    params(TaskListQuery),
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = Vec<TaskJson>),
        (status = 400, description = "Invalid sort field or status filter", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<TaskState>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let tasks = state.store.list_tasks(ListOptions::from(query)).await?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for GET /api/tasks/get - Returns a single task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/tasks/get",
    params(TaskIdQuery),
    responses(
        (status = 200, description = "Task found", body = TaskJson),
        (status = 400, description = "Missing or non-numeric ID", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<TaskState>,
    Query(query): Query<TaskIdQuery>,
) -> Result<Json<TaskJson>, TaskApiError> {
    let id = query.task_id()?;
    let task = state.store.get_task(id).await?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for POST /api/tasks/create - Validates and stores a new task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/tasks/create",
    request_body = TaskJson,
    responses(
        (status = 201, description = "Task created", body = TaskJson),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<TaskState>,
    payload: Result<Json<TaskJson>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskJson>), TaskApiError> {
    let Json(payload) = payload?;
    let content = payload.validate()?;

    let id = state.store.create_task(content.clone()).await?;
    let task = Task::new(id, content);
    tracing::info!("Task created successfully: {:?}", task);

    Ok((StatusCode::CREATED, Json(TaskJson::from(task))))
}

/// Handler for PUT /api/tasks/update - Replaces every field of an existing task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/api/tasks/update",
    params(TaskIdQuery),
    request_body = TaskJson,
    responses(
        (status = 200, description = "Task updated", body = TaskJson),
        (status = 400, description = "Validation failed or bad ID", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<TaskState>,
    Query(query): Query<TaskIdQuery>,
    payload: Result<Json<TaskJson>, JsonRejection>,
) -> Result<Json<TaskJson>, TaskApiError> {
    let id = query.task_id()?;
    let Json(payload) = payload?;
    let task = Task::new(id, payload.validate()?);

    state.store.update_task(task.clone()).await?;
    tracing::info!("Task updated successfully: {:?}", task);

    Ok(Json(TaskJson::from(task)))
}

/// Handler for DELETE /api/tasks/delete - Removes a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/tasks/delete",
    params(TaskIdQuery),
    responses(
        (status = 200, description = "Task deleted"),
        (status = 400, description = "Missing or non-numeric ID", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<TaskState>,
    Query(query): Query<TaskIdQuery>,
) -> Result<StatusCode, TaskApiError> {
    let id = query.task_id()?;
    state.store.delete_task(id).await?;
    tracing::info!("Task {} deleted", id);
    Ok(StatusCode::OK)
}

/// Creates and returns the tasks API router.
pub fn create_api_router(state: TaskState) -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks_handler))
        .route("/api/tasks/get", get(get_task_handler))
        .route("/api/tasks/create", post(create_task_handler))
        .route("/api/tasks/update", put(update_task_handler))
        .route("/api/tasks/delete", delete(delete_task_handler))
        .with_state(state)
}
