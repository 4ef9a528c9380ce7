/// Task model and database operations
///
/// Tasks live on a board, and a task is visible only to the owner of its board.
/// Every query joins through `boards` to enforce that, and hides tasks on
/// archived boards. Archived tasks drop out of listings but can still be
/// fetched, updated, and deleted by id.
///
/// # Completion timestamp
///
/// When a client marks a task completed without sending `completed_at`, the
/// server stamps the current time (keeping an existing stamp). Marking it not
/// completed clears the stamp. A `completed_at` sent by the client always wins.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     status VARCHAR(20) NOT NULL DEFAULT 'todo'
///         CHECK (status IN ('todo', 'in progress', 'done')),
///     description TEXT,
///     completed BOOLEAN NOT NULL DEFAULT FALSE,
///     is_archived BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     completed_at TIMESTAMPTZ,
///     deleted_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::deserialize_some;

const TASK_COLUMNS: &str = "id, board_id, title, status, description, completed, is_archived, \
                            created_at, updated_at, completed_at, deleted_at";

const TASK_COLUMNS_QUALIFIED: &str = "tasks.id, tasks.board_id, tasks.title, tasks.status, \
                                      tasks.description, tasks.completed, tasks.is_archived, \
                                      tasks.created_at, tasks.updated_at, tasks.completed_at, \
                                      tasks.deleted_at";

/// Task workflow status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "todo")]
    Todo,

    #[serde(rename = "in progress")]
    InProgress,

    #[serde(rename = "done")]
    Done,
}

impl TaskStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in progress",
            TaskStatus::Done => "done",
        }
    }
}

/// A status string that is not one of the known values
#[derive(Debug, thiserror::Error)]
#[error("Unknown task status: {0}")]
pub struct UnknownTaskStatus(pub String);

impl TryFrom<String> for TaskStatus {
    type Error = UnknownTaskStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            _ => Err(UnknownTaskStatus(value)),
        }
    }
}

/// A task on a board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    pub board_id: Uuid,

    pub title: String,

    #[sqlx(try_from = "String")]
    pub status: TaskStatus,

    pub description: Option<String>,

    pub completed: bool,

    pub is_archived: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub completed_at: Option<DateTime<Utc>>,

    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for creating a task
///
/// The board is passed separately and taken from the request path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub is_archived: bool,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl CreateTask {
    /// Completion stamp for a new task
    pub fn resolved_completed_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match (self.completed_at, self.completed) {
            (Some(at), _) => Some(at),
            (None, true) => Some(now),
            (None, false) => None,
        }
    }
}

/// Partial update for a task
///
/// Only fields that are `Some` are written. For nullable columns,
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub status: Option<TaskStatus>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,

    #[serde(default)]
    pub completed: Option<bool>,

    #[serde(default)]
    pub is_archived: Option<bool>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub completed_at: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub deleted_at: Option<Option<DateTime<Utc>>>,
}

impl Task {
    /// Builds a task row in memory, as the database defaults would
    pub fn new(id: Uuid, board_id: Uuid, data: CreateTask, now: DateTime<Utc>) -> Self {
        let completed_at = data.resolved_completed_at(now);

        Self {
            id,
            board_id,
            title: data.title,
            status: data.status,
            description: data.description,
            completed: data.completed,
            is_archived: data.is_archived,
            created_at: now,
            updated_at: now,
            completed_at,
            deleted_at: data.deleted_at,
        }
    }

    /// Applies a partial update in memory, including completion stamping
    pub fn apply_update(&mut self, data: UpdateTask, now: DateTime<Utc>) {
        if let Some(title) = data.title {
            self.title = title;
        }
        if let Some(status) = data.status {
            self.status = status;
        }
        if let Some(description) = data.description {
            self.description = description;
        }
        if let Some(is_archived) = data.is_archived {
            self.is_archived = is_archived;
        }
        if let Some(deleted_at) = data.deleted_at {
            self.deleted_at = deleted_at;
        }

        match (data.completed_at, data.completed) {
            (Some(completed_at), _) => self.completed_at = completed_at,
            (None, Some(true)) => self.completed_at = self.completed_at.or(Some(now)),
            (None, Some(false)) => self.completed_at = None,
            (None, None) => {}
        }
        if let Some(completed) = data.completed {
            self.completed = completed;
        }

        self.updated_at = now;
    }

    /// Creates a task on one of the owner's non-archived boards
    ///
    /// Returns None when the board does not exist, is archived, or belongs to
    /// someone else.
    pub async fn create(
        pool: &PgPool,
        owner: Uuid,
        board_id: Uuid,
        data: CreateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let completed_at = data.resolved_completed_at(Utc::now());

        let query = format!(
            r#"
            INSERT INTO tasks (board_id, title, status, description, completed, is_archived,
                               completed_at, deleted_at)
            SELECT boards.id, $3, $4, $5, $6, $7, $8, $9
            FROM boards
            WHERE boards.id = $1 AND boards.user_id = $2 AND boards.is_archived = FALSE
            RETURNING {}
            "#,
            TASK_COLUMNS
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(board_id)
            .bind(owner)
            .bind(data.title)
            .bind(data.status.as_str())
            .bind(data.description)
            .bind(data.completed)
            .bind(data.is_archived)
            .bind(completed_at)
            .bind(data.deleted_at)
            .fetch_optional(pool)
            .await
    }

    /// Lists non-archived tasks on one of the owner's boards, oldest first
    pub async fn list_for_board(
        pool: &PgPool,
        owner: Uuid,
        board_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM tasks
            JOIN boards ON boards.id = tasks.board_id
            WHERE tasks.board_id = $1
              AND boards.user_id = $2
              AND boards.is_archived = FALSE
              AND tasks.is_archived = FALSE
            ORDER BY tasks.created_at ASC, tasks.id ASC
            "#,
            TASK_COLUMNS_QUALIFIED
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(board_id)
            .bind(owner)
            .fetch_all(pool)
            .await
    }

    /// Finds a task by id on one of the owner's boards, archived or not
    pub async fn find_for_owner(
        pool: &PgPool,
        owner: Uuid,
        board_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM tasks
            JOIN boards ON boards.id = tasks.board_id
            WHERE tasks.id = $1
              AND tasks.board_id = $2
              AND boards.user_id = $3
              AND boards.is_archived = FALSE
            "#,
            TASK_COLUMNS_QUALIFIED
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(board_id)
            .bind(owner)
            .fetch_optional(pool)
            .await
    }

    /// Partially updates a task on one of the owner's boards
    pub async fn update(
        pool: &PgPool,
        owner: Uuid,
        board_id: Uuid,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 3;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.is_archived.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_archived = ${}", bind_count));
        }
        if data.deleted_at.is_some() {
            bind_count += 1;
            query.push_str(&format!(", deleted_at = ${}", bind_count));
        }
        if data.completed.is_some() {
            bind_count += 1;
            query.push_str(&format!(", completed = ${}", bind_count));
            if data.completed_at.is_none() {
                // SET expressions see the row's old values
                query.push_str(&format!(
                    ", completed_at = CASE WHEN ${} THEN COALESCE(completed_at, NOW()) ELSE NULL END",
                    bind_count
                ));
            }
        }
        if data.completed_at.is_some() {
            bind_count += 1;
            query.push_str(&format!(", completed_at = ${}", bind_count));
        }

        query.push_str(&format!(
            r#"
            FROM boards
            WHERE tasks.id = $1
              AND tasks.board_id = $2
              AND boards.id = tasks.board_id
              AND boards.user_id = $3
              AND boards.is_archived = FALSE
            RETURNING {}
            "#,
            TASK_COLUMNS_QUALIFIED
        ));

        let mut q = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(board_id)
            .bind(owner);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(status) = data.status {
            q = q.bind(status.as_str());
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(is_archived) = data.is_archived {
            q = q.bind(is_archived);
        }
        if let Some(deleted_at) = data.deleted_at {
            q = q.bind(deleted_at);
        }
        if let Some(completed) = data.completed {
            q = q.bind(completed);
        }
        if let Some(completed_at) = data.completed_at {
            q = q.bind(completed_at);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a task on one of the owner's boards
    pub async fn delete(
        pool: &PgPool,
        owner: Uuid,
        board_id: Uuid,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM tasks
            USING boards
            WHERE tasks.id = $1
              AND tasks.board_id = $2
              AND boards.id = tasks.board_id
              AND boards.user_id = $3
              AND boards.is_archived = FALSE
            "#,
        )
        .bind(id)
        .bind(board_id)
        .bind(owner)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
