use crate::entities::task;
use crate::task::{Task, TaskContent, TaskStatus};
use async_trait::async_trait;
use sea_orm::*;
use std::str::FromStr;
use std::sync::Arc;

/// Error type for task persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskRepositoryError {
    /// The requested sort field is not one of the sortable task fields.
    #[error("invalid sort field: {0}")]
    InvalidSortField(String),
    /// The status filter is not one of the known status codes.
    #[error("invalid status filter: {0}")]
    InvalidStatusFilter(String),
    /// No task exists with the given ID.
    #[error("Task with ID {0} not found")]
    TaskNotFound(i32),
    /// A stored row carries a status code outside the known set.
    #[error("Task with ID {id} has unknown status code {status}")]
    UnknownStoredStatus { id: i32, status: i32 },
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Task fields that a listing may be sorted by.
///
/// Sort columns end up in the `ORDER BY` clause as identifiers rather than
/// bound parameters, so only these names are ever accepted.
#[derive(Debug, PartialEq, Clone, Copy, Eq)]
pub enum SortField {
    Id,
    Text,
    CreatedDate,
    ExpectedDate,
    Status,
}

impl SortField {
    fn column(self) -> task::Column {
        match self {
            SortField::Id => task::Column::Id,
            SortField::Text => task::Column::TaskText,
            SortField::CreatedDate => task::Column::CreatedDate,
            SortField::ExpectedDate => task::Column::ExpectedDate,
            SortField::Status => task::Column::Status,
        }
    }
}

impl FromStr for SortField {
    type Err = TaskRepositoryError;

    fn from_str(field: &str) -> Result<Self, Self::Err> {
        match field {
            "id" => Ok(SortField::Id),
            "text" => Ok(SortField::Text),
            "createdDate" => Ok(SortField::CreatedDate),
            "expectedDate" => Ok(SortField::ExpectedDate),
            "status" => Ok(SortField::Status),
            other => Err(TaskRepositoryError::InvalidSortField(other.to_string())),
        }
    }
}

/// Raw filter and sort options for listing tasks, as received from the caller.
///
/// Empty strings are treated the same as absent values.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListOptions {
    pub status_filter: Option<String>,
    pub sort_order: Option<String>,
    pub sort_field: Option<String>,
}

impl ListOptions {
    fn status_filter(&self) -> Result<Option<TaskStatus>, TaskRepositoryError> {
        let Some(raw) = non_empty(&self.status_filter) else {
            return Ok(None);
        };
        raw.parse::<i32>()
            .ok()
            .and_then(|code| TaskStatus::try_from(code).ok())
            .map(Some)
            .ok_or_else(|| TaskRepositoryError::InvalidStatusFilter(raw.to_string()))
    }

    fn sort_field(&self) -> Result<Option<SortField>, TaskRepositoryError> {
        non_empty(&self.sort_field)
            .map(SortField::from_str)
            .transpose()
    }

    fn order(&self) -> Order {
        match non_empty(&self.sort_order) {
            Some("desc") => Order::Desc,
            _ => Order::Asc,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

/// Builds the listing query. Fails without touching the database when an
/// option is invalid.
fn build_list_query(options: &ListOptions) -> Result<Select<task::Entity>, TaskRepositoryError> {
    let mut query = task::Entity::find();

    if let Some(status) = options.status_filter()? {
        query = query.filter(task::Column::Status.eq(status.code()));
    }

    if let Some(field) = options.sort_field()? {
        query = query.order_by(field.column(), options.order());
    }

    Ok(query)
}

impl TryFrom<task::Model> for Task {
    type Error = TaskRepositoryError;

    fn try_from(model: task::Model) -> Result<Self, Self::Error> {
        let status = TaskStatus::try_from(model.status).map_err(|status| {
            TaskRepositoryError::UnknownStoredStatus {
                id: model.id,
                status,
            }
        })?;
        Ok(Task::new(
            model.id,
            TaskContent::new(
                model.task_text,
                model.created_date,
                model.expected_date,
                status,
            ),
        ))
    }
}

/// Persistence operations on tasks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Lists tasks, optionally filtered by status and sorted by a whitelisted field.
    async fn list_tasks(&self, options: ListOptions) -> Result<Vec<Task>, TaskRepositoryError>;

    /// Stores a new task and returns the ID assigned by the database.
    async fn create_task(&self, content: TaskContent) -> Result<i32, TaskRepositoryError>;

    /// Replaces every editable field of an existing task.
    async fn update_task(&self, task: Task) -> Result<(), TaskRepositoryError>;

    /// Deletes a task by its ID.
    async fn delete_task(&self, id: i32) -> Result<(), TaskRepositoryError>;

    /// Retrieves a task by its ID.
    async fn get_task(&self, id: i32) -> Result<Task, TaskRepositoryError>;
}

/// `TaskStore` backed by the `tasks` table.
#[derive(Clone, Debug)]
pub struct TaskRepository {
    db: Arc<DatabaseConnection>,
}

impl TaskRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn content_to_active_model(content: &TaskContent) -> task::ActiveModel {
    task::ActiveModel {
        task_text: ActiveValue::Set(content.text().to_string()),
        created_date: ActiveValue::Set(content.created_date()),
        expected_date: ActiveValue::Set(content.expected_date()),
        status: ActiveValue::Set(content.status().code()),
        ..Default::default()
    }
}

#[async_trait]
impl TaskStore for TaskRepository {
    #[tracing::instrument(skip(self))]
    async fn list_tasks(&self, options: ListOptions) -> Result<Vec<Task>, TaskRepositoryError> {
        let query = build_list_query(&options)?;
        query
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Task::try_from)
            .collect()
    }

    #[tracing::instrument(skip(self))]
    async fn create_task(&self, content: TaskContent) -> Result<i32, TaskRepositoryError> {
        let created_model = content_to_active_model(&content)
            .insert(self.db.as_ref())
            .await?;
        Ok(created_model.id)
    }

    #[tracing::instrument(skip(self))]
    async fn update_task(&self, task: Task) -> Result<(), TaskRepositoryError> {
        let result = task::Entity::update_many()
            .set(content_to_active_model(task.content()))
            .filter(task::Column::Id.eq(task.id()))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(TaskRepositoryError::TaskNotFound(task.id()));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_task(&self, id: i32) -> Result<(), TaskRepositoryError> {
        let result = task::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(TaskRepositoryError::TaskNotFound(id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_task(&self, id: i32) -> Result<Task, TaskRepositoryError> {
        let model = task::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(TaskRepositoryError::TaskNotFound(id))?;
        Task::try_from(model)
    }
}
