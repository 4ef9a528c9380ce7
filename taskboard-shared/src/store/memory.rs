/// In-process store.
///
/// Mirrors the Postgres behaviour that the API relies on: unique usernames and
/// case-insensitive unique emails, owner scoping, archived filtering, and the
/// board → task delete cascade.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BoardRepository, Result, Store, StoreError, TaskRepository, UserRepository};
use crate::models::board::{Board, CreateBoard, UpdateBoard};
use crate::models::task::{CreateTask, Task, UpdateTask};
use crate::models::user::{NewUser, User};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    boards: HashMap<Uuid, Board>,
    tasks: HashMap<Uuid, Task>,
}

impl Tables {
    fn visible_board(&self, owner: Uuid, id: Uuid) -> Option<&Board> {
        self.boards
            .get(&id)
            .filter(|b| b.user_id == owner && !b.is_archived)
    }

    fn visible_task_id(&self, owner: Uuid, board_id: Uuid, id: Uuid) -> Option<Uuid> {
        self.visible_board(owner, board_id)?;
        self.tasks
            .get(&id)
            .filter(|t| t.board_id == board_id)
            .map(|t| t.id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    /// Number of stored tasks, across all boards and owners
    pub async fn task_count(&self) -> usize {
        self.tables.read().await.tasks.len()
    }
}

fn unique_violation(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: Some(constraint.to_string()),
        message: format!("duplicate key value violates unique constraint \"{}\"", constraint),
    }
}

fn sorted_by_creation<T, F>(mut rows: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> (chrono::DateTime<Utc>, Uuid),
{
    rows.sort_by_key(|r| key(r));
    rows
}

#[async_trait::async_trait]
impl UserRepository for MemoryStore {
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().any(|u| u.username == username))
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        let email = email.to_lowercase();
        Ok(tables.users.values().any(|u| u.email.to_lowercase() == email))
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.username == user.username) {
            return Err(unique_violation("users_username_key"));
        }
        let email = user.email.to_lowercase();
        if tables.users.values().any(|u| u.email.to_lowercase() == email) {
            return Err(unique_violation("users_email_lower_key"));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            bio: user.bio,
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        tables.users.insert(created.id, created.clone());

        Ok(created)
    }

    async fn activate_user(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;

        match tables.users.get_mut(&id) {
            Some(user) if !user.is_active => {
                user.is_active = true;
                user.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<()> {
        if let Some(user) = self.tables.write().await.users.get_mut(&id) {
            user.last_login_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let users = sorted_by_creation(tables.users.values().cloned().collect(), |u| {
            (u.created_at, u.id)
        });

        Ok(users
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn superuser_exists(&self) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().any(|u| u.is_superuser))
    }
}

#[async_trait::async_trait]
impl BoardRepository for MemoryStore {
    async fn list_boards(&self, owner: Uuid) -> Result<Vec<Board>> {
        let tables = self.tables.read().await;
        let boards = tables
            .boards
            .values()
            .filter(|b| b.user_id == owner && !b.is_archived)
            .cloned()
            .collect();

        Ok(sorted_by_creation(boards, |b| (b.created_at, b.id)))
    }

    async fn find_board(&self, owner: Uuid, id: Uuid) -> Result<Option<Board>> {
        Ok(self.tables.read().await.visible_board(owner, id).cloned())
    }

    async fn create_board(&self, owner: Uuid, board: CreateBoard) -> Result<Board> {
        let created = Board::new(Uuid::new_v4(), owner, board, Utc::now());
        self.tables
            .write()
            .await
            .boards
            .insert(created.id, created.clone());

        Ok(created)
    }

    async fn update_board(
        &self,
        owner: Uuid,
        id: Uuid,
        update: UpdateBoard,
    ) -> Result<Option<Board>> {
        let mut tables = self.tables.write().await;

        if tables.visible_board(owner, id).is_none() {
            return Ok(None);
        }
        Ok(tables.boards.get_mut(&id).map(|board| {
            board.apply_update(update, Utc::now());
            board.clone()
        }))
    }

    async fn delete_board(&self, owner: Uuid, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;

        if tables.visible_board(owner, id).is_none() {
            return Ok(false);
        }
        tables.boards.remove(&id);
        tables.tasks.retain(|_, t| t.board_id != id);

        Ok(true)
    }
}

#[async_trait::async_trait]
impl TaskRepository for MemoryStore {
    async fn list_tasks(&self, owner: Uuid, board_id: Uuid) -> Result<Vec<Task>> {
        let tables = self.tables.read().await;

        if tables.visible_board(owner, board_id).is_none() {
            return Ok(Vec::new());
        }
        let tasks = tables
            .tasks
            .values()
            .filter(|t| t.board_id == board_id && !t.is_archived)
            .cloned()
            .collect();

        Ok(sorted_by_creation(tasks, |t| (t.created_at, t.id)))
    }

    async fn find_task(&self, owner: Uuid, board_id: Uuid, id: Uuid) -> Result<Option<Task>> {
        let tables = self.tables.read().await;

        Ok(tables
            .visible_task_id(owner, board_id, id)
            .and_then(|id| tables.tasks.get(&id).cloned()))
    }

    async fn create_task(
        &self,
        owner: Uuid,
        board_id: Uuid,
        task: CreateTask,
    ) -> Result<Option<Task>> {
        let mut tables = self.tables.write().await;

        if tables.visible_board(owner, board_id).is_none() {
            return Ok(None);
        }
        let created = Task::new(Uuid::new_v4(), board_id, task, Utc::now());
        tables.tasks.insert(created.id, created.clone());

        Ok(Some(created))
    }

    async fn update_task(
        &self,
        owner: Uuid,
        board_id: Uuid,
        id: Uuid,
        update: UpdateTask,
    ) -> Result<Option<Task>> {
        let mut tables = self.tables.write().await;

        let Some(id) = tables.visible_task_id(owner, board_id, id) else {
            return Ok(None);
        };
        Ok(tables.tasks.get_mut(&id).map(|task| {
            task.apply_update(update, Utc::now());
            task.clone()
        }))
    }

    async fn delete_task(&self, owner: Uuid, board_id: Uuid, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;

        let Some(id) = tables.visible_task_id(owner, board_id, id) else {
            return Ok(false);
        };
        Ok(tables.tasks.remove(&id).is_some())
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser::pending(
            name.to_string(),
            format!("{}@example.com", name),
            "$argon2id$placeholder".to_string(),
        )
    }

    fn board(title: &str) -> CreateBoard {
        CreateBoard {
            title: title.to_string(),
            ..Default::default()
        }
    }

    fn task(title: &str) -> CreateTask {
        CreateTask {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email_rejected() {
        let store = MemoryStore::new();
        store.create_user(new_user("ana")).await.unwrap();

        let dup_name = store.create_user(new_user("ana")).await;
        assert!(matches!(dup_name, Err(StoreError::UniqueViolation { .. })));

        let mut dup_email = new_user("other");
        dup_email.email = "ANA@example.com".to_string();
        let dup_email = store.create_user(dup_email).await;
        assert!(matches!(dup_email, Err(StoreError::UniqueViolation { .. })));

        assert_eq!(store.user_count().await, 1);
        assert!(store.email_exists("Ana@Example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_email_uniqueness_folds_non_ascii_case() {
        let store = MemoryStore::new();
        let mut user = new_user("zoe");
        user.email = "ÉLODIE@example.com".to_string();
        store.create_user(user).await.unwrap();

        assert!(store.email_exists("élodie@example.com").await.unwrap());

        let mut dup = new_user("other");
        dup.email = "élodie@EXAMPLE.com".to_string();
        let dup = store.create_user(dup).await;
        assert!(matches!(dup, Err(StoreError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_activate_only_once() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("ana")).await.unwrap();

        assert!(store.activate_user(user.id).await.unwrap());
        assert!(!store.activate_user(user.id).await.unwrap());
        assert!(!store.activate_user(Uuid::new_v4()).await.unwrap());

        let user = store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert!(user.is_active);
    }

    #[tokio::test]
    async fn test_boards_are_owner_scoped() {
        let store = MemoryStore::new();
        let (ana, bob) = (Uuid::new_v4(), Uuid::new_v4());

        let mine = store.create_board(ana, board("Mine")).await.unwrap();
        store.create_board(bob, board("Theirs")).await.unwrap();

        let listed = store.list_boards(ana).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);

        assert!(store.find_board(bob, mine.id).await.unwrap().is_none());
        assert!(store
            .update_board(bob, mine.id, UpdateBoard::default())
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete_board(bob, mine.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_archived_board_hidden() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let b = store.create_board(owner, board("Old")).await.unwrap();

        store
            .update_board(
                owner,
                b.id,
                UpdateBoard {
                    is_archived: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(store.list_boards(owner).await.unwrap().is_empty());
        assert!(store.find_board(owner, b.id).await.unwrap().is_none());
        assert!(store.create_task(owner, b.id, task("t")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_archived_task_listed_no_more_but_retrievable() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let b = store.create_board(owner, board("Home")).await.unwrap();
        let t = store
            .create_task(owner, b.id, task("Sweep"))
            .await
            .unwrap()
            .unwrap();

        store
            .update_task(
                owner,
                b.id,
                t.id,
                UpdateTask {
                    is_archived: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(store.list_tasks(owner, b.id).await.unwrap().is_empty());
        let found = store.find_task(owner, b.id, t.id).await.unwrap().unwrap();
        assert!(found.is_archived);
    }

    #[tokio::test]
    async fn test_task_scoped_to_its_board() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let home = store.create_board(owner, board("Home")).await.unwrap();
        let work = store.create_board(owner, board("Work")).await.unwrap();
        let t = store
            .create_task(owner, home.id, task("Sweep"))
            .await
            .unwrap()
            .unwrap();

        assert!(store.find_task(owner, work.id, t.id).await.unwrap().is_none());
        assert!(store.find_task(Uuid::new_v4(), home.id, t.id).await.unwrap().is_none());
        assert!(!store.delete_task(owner, work.id, t.id).await.unwrap());
        assert!(store.delete_task(owner, home.id, t.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_board_cascades() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let b = store.create_board(owner, board("Home")).await.unwrap();
        store.create_task(owner, b.id, task("a")).await.unwrap();
        store.create_task(owner, b.id, task("b")).await.unwrap();
        assert_eq!(store.task_count().await, 2);

        assert!(store.delete_board(owner, b.id).await.unwrap());
        assert_eq!(store.task_count().await, 0);
    }
}
