use crate::entities::*;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::*;
use serde::Serialize;
use utoipa::ToSchema;

pub mod api;
pub mod validation;

pub use api::{TaskState, create_task_router};
pub use validation::{NewTask, TaskChanges, ValidationError};

/// A task as exposed by the API.
#[derive(Debug, PartialEq, Clone, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier for the task
    id: i32,
    /// Normalized (trimmed, lower-cased) title, unique across tasks
    title: String,
    /// Free-form color label
    color: String,
    /// Whether the task is done
    completed: bool,
    created_at: DateTime<FixedOffset>,
    updated_at: DateTime<FixedOffset>,
}

impl Task {
    /// Returns the ID of the task.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Returns the normalized title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the color label.
    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn created_at(&self) -> DateTime<FixedOffset> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<FixedOffset> {
        self.updated_at
    }
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            color: model.color,
            completed: model.completed,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Normalizes a title into its uniqueness key.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Persistence gateway for tasks.
///
/// Every operation reports storage failures as the raw [`DbErr`] so that the
/// error translator can tell constraint violations and missing records apart.
pub struct TaskService<'a> {
    db: &'a DatabaseConnection,
}

impl TaskService<'_> {
    pub fn new(db: &DatabaseConnection) -> TaskService<'_> {
        TaskService { db }
    }

    /// Retrieves all tasks, ordered by ID.
    #[tracing::instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Task>, DbErr> {
        let tasks = task::Entity::find()
            .order_by_asc(task::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    /// Looks up a task by its already normalized title.
    #[tracing::instrument(skip(self))]
    pub async fn find_by_title(&self, normalized_title: &str) -> Result<Option<Task>, DbErr> {
        let model = task::Entity::find()
            .filter(task::Column::Title.eq(normalized_title))
            .one(self.db)
            .await?;
        Ok(model.map(Task::from))
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Task>, DbErr> {
        let model = task::Entity::find_by_id(id).one(self.db).await?;
        Ok(model.map(Task::from))
    }

    /// Inserts a new task. The title is stored as given; callers normalize it.
    ///
    /// # Errors
    ///
    /// A title that already exists surfaces as a unique constraint violation.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, new_task: NewTask) -> Result<Task, DbErr> {
        let active_model = task::ActiveModel {
            title: ActiveValue::Set(new_task.title),
            color: ActiveValue::Set(new_task.color),
            completed: ActiveValue::Set(new_task.completed),
            ..Default::default()
        };
        let created_model = active_model.insert(self.db).await?;
        Ok(Task::from(created_model))
    }

    /// Applies the present fields of `changes` to the task with the given ID.
    ///
    /// An empty change set leaves the row untouched and returns it as stored.
    ///
    /// # Errors
    ///
    /// Returns [`DbErr::RecordNotUpdated`] or [`DbErr::RecordNotFound`] when no
    /// task has this ID.
    #[tracing::instrument(skip(self))]
    pub async fn update(&self, id: i32, changes: TaskChanges) -> Result<Task, DbErr> {
        if changes.is_empty() {
            return self
                .find_by_id(id)
                .await?
                .ok_or_else(|| DbErr::RecordNotFound(format!("Task with ID {id} not found")));
        }

        let mut active_model = task::ActiveModel {
            id: ActiveValue::Unchanged(id),
            ..Default::default()
        };
        if let Some(title) = changes.title {
            active_model.title = ActiveValue::Set(title);
        }
        if let Some(color) = changes.color {
            active_model.color = ActiveValue::Set(color);
        }
        if let Some(completed) = changes.completed {
            active_model.completed = ActiveValue::Set(completed);
        }

        active_model.updated_at = ActiveValue::Set(Utc::now().fixed_offset());
        let updated_model = active_model.update(self.db).await?;
        Ok(Task::from(updated_model))
    }

    /// Deletes the task with the given ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbErr::RecordNotFound`] when no row was deleted.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), DbErr> {
        let result = task::Entity::delete_by_id(id).exec(self.db).await?;
        if result.rows_affected == 0 {
            return Err(DbErr::RecordNotFound(format!(
                "Task with ID {id} not found"
            )));
        }
        Ok(())
    }
}
