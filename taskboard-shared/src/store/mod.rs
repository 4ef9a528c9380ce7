/// Storage interfaces used by the API handlers.
///
/// Each table has a repository trait. [`postgres::PgStore`] implements them on
/// top of the model queries; [`memory::MemoryStore`] keeps everything in
/// process for tests and local experiments.
///
/// Ownership scoping lives in the repositories: every board and task method
/// takes the acting user's id, and "does not exist" and "belongs to someone
/// else" both come back as `None`/`false`.

use uuid::Uuid;

use crate::models::board::{Board, CreateBoard, UpdateBoard};
use crate::models::task::{CreateTask, Task, UpdateTask};
use crate::models::user::{NewUser, User};

pub mod memory;
pub mod postgres;

/// Errors returned by any store implementation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("Unique constraint violation: {message}")]
    UniqueViolation {
        constraint: Option<String>,
        message: String,
    },

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation {
                    constraint: db_err.constraint().map(|s| s.to_string()),
                    message: db_err.message().to_string(),
                };
            }
        }
        StoreError::Database(err)
    }
}

/// User accounts
#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn username_exists(&self, username: &str) -> Result<bool>;

    /// Case-insensitive
    async fn email_exists(&self, email: &str) -> Result<bool>;

    /// Fails with [`StoreError::UniqueViolation`] on a duplicate username or email
    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// Flips `is_active` from false to true. Returns whether this call did it.
    async fn activate_user(&self, id: Uuid) -> Result<bool>;

    async fn touch_last_login(&self, id: Uuid) -> Result<()>;

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>>;

    async fn superuser_exists(&self) -> Result<bool>;
}

/// Boards, scoped to their owner
#[async_trait::async_trait]
pub trait BoardRepository: Send + Sync {
    /// Non-archived boards of `owner`
    async fn list_boards(&self, owner: Uuid) -> Result<Vec<Board>>;

    async fn find_board(&self, owner: Uuid, id: Uuid) -> Result<Option<Board>>;

    async fn create_board(&self, owner: Uuid, board: CreateBoard) -> Result<Board>;

    async fn update_board(&self, owner: Uuid, id: Uuid, update: UpdateBoard)
        -> Result<Option<Board>>;

    /// Also deletes the board's tasks
    async fn delete_board(&self, owner: Uuid, id: Uuid) -> Result<bool>;
}

/// Tasks, scoped through their board's owner
#[async_trait::async_trait]
pub trait TaskRepository: Send + Sync {
    /// Non-archived tasks on the board
    async fn list_tasks(&self, owner: Uuid, board_id: Uuid) -> Result<Vec<Task>>;

    /// Archived tasks are included
    async fn find_task(&self, owner: Uuid, board_id: Uuid, id: Uuid) -> Result<Option<Task>>;

    /// None when the board is not visible to `owner`
    async fn create_task(&self, owner: Uuid, board_id: Uuid, task: CreateTask)
        -> Result<Option<Task>>;

    async fn update_task(
        &self,
        owner: Uuid,
        board_id: Uuid,
        id: Uuid,
        update: UpdateTask,
    ) -> Result<Option<Task>>;

    async fn delete_task(&self, owner: Uuid, board_id: Uuid, id: Uuid) -> Result<bool>;
}

/// Everything the API needs from storage
#[async_trait::async_trait]
pub trait Store: UserRepository + BoardRepository + TaskRepository {
    /// Cheap liveness probe
    async fn ping(&self) -> Result<()>;
}
