use chrono::NaiveDate;
use repository::TaskStore;
use std::sync::Arc;

pub mod api;
pub mod repository;

/// Maximum length of a task's text, counted in characters after trimming.
pub const MAX_TEXT_LENGTH: usize = 255;

/// Lifecycle status of a task. The discriminant is the wire and storage code.
#[derive(Debug, PartialEq, Clone, Copy, Eq, Hash)]
pub enum TaskStatus {
    InProgress = 0,
    Completed = 1,
    Testing = 2,
    Returned = 3,
}

impl TaskStatus {
    /// Returns the integer code used in JSON payloads and in the `tasks.status` column.
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for TaskStatus {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(TaskStatus::InProgress),
            1 => Ok(TaskStatus::Completed),
            2 => Ok(TaskStatus::Testing),
            3 => Ok(TaskStatus::Returned),
            other => Err(other),
        }
    }
}

/// The user-editable fields of a task, already validated.
#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct TaskContent {
    text: String,
    created_date: NaiveDate,
    expected_date: NaiveDate,
    status: TaskStatus,
}

impl TaskContent {
    pub fn new(
        text: String,
        created_date: NaiveDate,
        expected_date: NaiveDate,
        status: TaskStatus,
    ) -> Self {
        Self {
            text,
            created_date,
            expected_date,
            status,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_date(&self) -> NaiveDate {
        self.created_date
    }

    pub fn expected_date(&self) -> NaiveDate {
        self.expected_date
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }
}

/// A stored task: its store-assigned ID plus its content.
#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct Task {
    id: i32,
    content: TaskContent,
}

impl Task {
    pub fn new(id: i32, content: TaskContent) -> Self {
        Self { id, content }
    }

    /// Returns the ID of the task.
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn content(&self) -> &TaskContent {
        &self.content
    }

    pub fn text(&self) -> &str {
        self.content.text()
    }

    pub fn created_date(&self) -> NaiveDate {
        self.content.created_date()
    }

    pub fn expected_date(&self) -> NaiveDate {
        self.content.expected_date()
    }

    pub fn status(&self) -> TaskStatus {
        self.content.status()
    }
}

/// Router state shared by the task handlers.
#[derive(Clone)]
pub struct TaskState {
    pub store: Arc<dyn TaskStore>,
}

impl TaskState {
    /// Creates task state backed by the `tasks` table of the given database.
    pub fn from_db(db: Arc<sea_orm::DatabaseConnection>) -> Self {
        Self {
            store: Arc::new(repository::TaskRepository::new(db)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_convert_every_status_code() {
        for status in [
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Testing,
            TaskStatus::Returned,
        ] {
            assert_eq!(TaskStatus::try_from(status.code()), Ok(status));
        }
    }

    #[test]
    fn can_reject_unknown_status_codes() {
        assert_eq!(TaskStatus::try_from(4), Err(4));
        assert_eq!(TaskStatus::try_from(-1), Err(-1));
    }
}
