/// Postgres-backed store. Thin wrapper over the model queries.

use sqlx::PgPool;
use uuid::Uuid;

use super::{BoardRepository, Result, Store, TaskRepository, UserRepository};
use crate::db::pool::health_check;
use crate::models::board::{Board, CreateBoard, UpdateBoard};
use crate::models::task::{CreateTask, Task, UpdateTask};
use crate::models::user::{NewUser, User};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl UserRepository for PgStore {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(User::find_by_username(&self.pool, username).await?)
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        Ok(User::username_exists(&self.pool, username).await?)
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(User::email_exists(&self.pool, email).await?)
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        Ok(User::create(&self.pool, user).await?)
    }

    async fn activate_user(&self, id: Uuid) -> Result<bool> {
        Ok(User::activate(&self.pool, id).await?)
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<()> {
        User::update_last_login(&self.pool, id).await?;
        Ok(())
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>> {
        Ok(User::list(&self.pool, limit, offset).await?)
    }

    async fn superuser_exists(&self) -> Result<bool> {
        Ok(User::superuser_exists(&self.pool).await?)
    }
}

#[async_trait::async_trait]
impl BoardRepository for PgStore {
    async fn list_boards(&self, owner: Uuid) -> Result<Vec<Board>> {
        Ok(Board::list_by_owner(&self.pool, owner).await?)
    }

    async fn find_board(&self, owner: Uuid, id: Uuid) -> Result<Option<Board>> {
        Ok(Board::find_for_owner(&self.pool, owner, id).await?)
    }

    async fn create_board(&self, owner: Uuid, board: CreateBoard) -> Result<Board> {
        Ok(Board::create(&self.pool, owner, board).await?)
    }

    async fn update_board(
        &self,
        owner: Uuid,
        id: Uuid,
        update: UpdateBoard,
    ) -> Result<Option<Board>> {
        Ok(Board::update(&self.pool, owner, id, update).await?)
    }

    async fn delete_board(&self, owner: Uuid, id: Uuid) -> Result<bool> {
        Ok(Board::delete(&self.pool, owner, id).await?)
    }
}

#[async_trait::async_trait]
impl TaskRepository for PgStore {
    async fn list_tasks(&self, owner: Uuid, board_id: Uuid) -> Result<Vec<Task>> {
        Ok(Task::list_for_board(&self.pool, owner, board_id).await?)
    }

    async fn find_task(&self, owner: Uuid, board_id: Uuid, id: Uuid) -> Result<Option<Task>> {
        Ok(Task::find_for_owner(&self.pool, owner, board_id, id).await?)
    }

    async fn create_task(
        &self,
        owner: Uuid,
        board_id: Uuid,
        task: CreateTask,
    ) -> Result<Option<Task>> {
        Ok(Task::create(&self.pool, owner, board_id, task).await?)
    }

    async fn update_task(
        &self,
        owner: Uuid,
        board_id: Uuid,
        id: Uuid,
        update: UpdateTask,
    ) -> Result<Option<Task>> {
        Ok(Task::update(&self.pool, owner, board_id, id, update).await?)
    }

    async fn delete_task(&self, owner: Uuid, board_id: Uuid, id: Uuid) -> Result<bool> {
        Ok(Task::delete(&self.pool, owner, board_id, id).await?)
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        Ok(health_check(&self.pool).await?)
    }
}
