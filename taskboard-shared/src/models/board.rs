/// Board model and database operations
///
/// A board belongs to exactly one user. Every query here is scoped by the
/// owner's id, and archived boards are treated as if they did not exist.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE boards (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     is_archived BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::deserialize_some;

const BOARD_COLUMNS: &str = "id, user_id, title, description, is_archived, created_at, updated_at";

/// A board owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Board {
    pub id: Uuid,

    /// Owner
    pub user_id: Uuid,

    pub title: String,

    pub description: Option<String>,

    /// Archived boards are hidden from every board and task endpoint
    pub is_archived: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a board
///
/// The owner is passed separately and always comes from the authenticated user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBoard {
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub is_archived: bool,
}

/// Partial update for a board
///
/// Only fields that are `Some` are written. `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBoard {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,

    #[serde(default)]
    pub is_archived: Option<bool>,
}

impl UpdateBoard {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.is_archived.is_none()
    }
}

impl Board {
    /// Builds a board row in memory, as the database defaults would
    pub fn new(id: Uuid, owner: Uuid, data: CreateBoard, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: owner,
            title: data.title,
            description: data.description,
            is_archived: data.is_archived,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update in memory
    pub fn apply_update(&mut self, data: UpdateBoard, now: DateTime<Utc>) {
        if let Some(title) = data.title {
            self.title = title;
        }
        if let Some(description) = data.description {
            self.description = description;
        }
        if let Some(is_archived) = data.is_archived {
            self.is_archived = is_archived;
        }
        self.updated_at = now;
    }

    /// Creates a board owned by `owner`
    pub async fn create(pool: &PgPool, owner: Uuid, data: CreateBoard) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO boards (user_id, title, description, is_archived)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            BOARD_COLUMNS
        );

        sqlx::query_as::<_, Board>(&query)
            .bind(owner)
            .bind(data.title)
            .bind(data.description)
            .bind(data.is_archived)
            .fetch_one(pool)
            .await
    }

    /// Lists the owner's non-archived boards, oldest first
    pub async fn list_by_owner(pool: &PgPool, owner: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM boards
            WHERE user_id = $1 AND is_archived = FALSE
            ORDER BY created_at ASC, id ASC
            "#,
            BOARD_COLUMNS
        );

        sqlx::query_as::<_, Board>(&query)
            .bind(owner)
            .fetch_all(pool)
            .await
    }

    /// Finds a non-archived board by id, only if `owner` owns it
    pub async fn find_for_owner(
        pool: &PgPool,
        owner: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM boards WHERE id = $1 AND user_id = $2 AND is_archived = FALSE",
            BOARD_COLUMNS
        );

        sqlx::query_as::<_, Board>(&query)
            .bind(id)
            .bind(owner)
            .fetch_optional(pool)
            .await
    }

    /// Partially updates one of the owner's non-archived boards
    ///
    /// Returns None if the board does not exist, is archived, or belongs to
    /// someone else.
    pub async fn update(
        pool: &PgPool,
        owner: Uuid,
        id: Uuid,
        data: UpdateBoard,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE boards SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.is_archived.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_archived = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND user_id = $2 AND is_archived = FALSE RETURNING {}",
            BOARD_COLUMNS
        ));

        let mut q = sqlx::query_as::<_, Board>(&query).bind(id).bind(owner);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(is_archived) = data.is_archived {
            q = q.bind(is_archived);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes one of the owner's non-archived boards, cascading to its tasks
    pub async fn delete(pool: &PgPool, owner: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM boards WHERE id = $1 AND user_id = $2 AND is_archived = FALSE",
        )
        .bind(id)
        .bind(owner)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
