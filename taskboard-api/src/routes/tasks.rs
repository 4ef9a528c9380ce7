/// Task endpoints, nested under a board
///
/// A task is reachable only through the board it belongs to, and only by that
/// board's owner. Asking for a task through another board, or through someone
/// else's board, is a 404.
///
/// # Endpoints
///
/// - `GET /v1/boards/:board_id/tasks` - List non-archived tasks
/// - `POST /v1/boards/:board_id/tasks` - Create task
/// - `GET /v1/boards/:board_id/tasks/:id` - Get task (archived included)
/// - `PATCH /v1/boards/:board_id/tasks/:id` - Partially update task
/// - `DELETE /v1/boards/:board_id/tasks/:id` - Delete task

use axum::{extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::{
        deserialize_some,
        task::{CreateTask, Task, TaskStatus, UpdateTask},
    },
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, Path},
};

fn task_not_found() -> ApiError {
    ApiError::NotFound("Task not found.".to_string())
}

fn board_not_found() -> ApiError {
    ApiError::NotFound("Board not found.".to_string())
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,

    /// `"todo"`, `"in progress"`, or `"done"`
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

impl From<CreateTaskRequest> for CreateTask {
    fn from(req: CreateTaskRequest) -> Self {
        CreateTask {
            title: req.title,
            status: req.status,
            description: req.description,
            completed: req.completed,
            is_archived: req.is_archived,
            completed_at: req.completed_at,
            deleted_at: req.deleted_at,
        }
    }
}

/// Update task request; absent fields are left alone, `null` clears
/// nullable fields
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
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

impl From<UpdateTaskRequest> for UpdateTask {
    fn from(req: UpdateTaskRequest) -> Self {
        UpdateTask {
            title: req.title,
            status: req.status,
            description: req.description,
            completed: req.completed,
            is_archived: req.is_archived,
            completed_at: req.completed_at,
            deleted_at: req.deleted_at,
        }
    }
}

/// Lists the board's non-archived tasks
///
/// An owned board with no tasks answers with an empty list.
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Task>>> {
    if state.store.find_board(auth.user_id, board_id).await?.is_none() {
        return Err(board_not_found());
    }

    let tasks = state.store.list_tasks(auth.user_id, board_id).await?;
    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(board_id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let task = state
        .store
        .create_task(auth.user_id, board_id, req.into())
        .await?
        .ok_or_else(board_not_found)?;

    tracing::info!(
        user_id = %auth.user_id,
        board_id = %board_id,
        task_id = %task.id,
        "Task created"
    );

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((board_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Task>> {
    state
        .store
        .find_task(auth.user_id, board_id, id)
        .await?
        .map(Json)
        .ok_or_else(task_not_found)
}

/// Partially updates a task
///
/// Marking a task completed without a `completed_at` stamps the current time;
/// marking it not completed clears the stamp.
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((board_id, id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    state
        .store
        .update_task(auth.user_id, board_id, id, req.into())
        .await?
        .map(Json)
        .ok_or_else(task_not_found)
}

pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((board_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    if !state.store.delete_task(auth.user_id, board_id, id).await? {
        return Err(task_not_found());
    }

    tracing::info!(user_id = %auth.user_id, task_id = %id, "Task deleted");
    Ok(StatusCode::NO_CONTENT)
}
