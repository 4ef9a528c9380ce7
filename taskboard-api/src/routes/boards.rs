/// Board endpoints
///
/// All boards are scoped to the authenticated user. A board owned by someone
/// else answers exactly like a board that does not exist (404). Archived
/// boards are hidden everywhere.
///
/// # Endpoints
///
/// - `GET /v1/boards` - List boards
/// - `POST /v1/boards` - Create board
/// - `GET /v1/boards/:id` - Get board
/// - `PATCH /v1/boards/:id` - Partially update board
/// - `DELETE /v1/boards/:id` - Delete board and its tasks

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::{
        board::{Board, CreateBoard, UpdateBoard},
        deserialize_some,
    },
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, Path},
};

fn board_not_found() -> ApiError {
    ApiError::NotFound("Board not found.".to_string())
}

/// Create board request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBoardRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub is_archived: bool,
}

impl From<CreateBoardRequest> for CreateBoard {
    fn from(req: CreateBoardRequest) -> Self {
        CreateBoard {
            title: req.title,
            description: req.description,
            is_archived: req.is_archived,
        }
    }
}

/// Update board request; absent fields are left alone
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBoardRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    #[serde(default)]
    pub title: Option<String>,

    /// `null` clears the description
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,

    #[serde(default)]
    pub is_archived: Option<bool>,
}

impl From<UpdateBoardRequest> for UpdateBoard {
    fn from(req: UpdateBoardRequest) -> Self {
        UpdateBoard {
            title: req.title,
            description: req.description,
            is_archived: req.is_archived,
        }
    }
}

/// Lists the user's boards
///
/// # Errors
///
/// - `404 Not Found`: The user has no boards
pub async fn list_boards(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Board>>> {
    let boards = state.store.list_boards(auth.user_id).await?;

    if boards.is_empty() {
        return Err(ApiError::NotFound("No boards found.".to_string()));
    }

    Ok(Json(boards))
}

pub async fn create_board(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateBoardRequest>,
) -> ApiResult<(StatusCode, Json<Board>)> {
    req.validate()?;

    let board = state.store.create_board(auth.user_id, req.into()).await?;
    tracing::info!(user_id = %auth.user_id, board_id = %board.id, "Board created");

    Ok((StatusCode::CREATED, Json(board)))
}

pub async fn get_board(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Board>> {
    state
        .store
        .find_board(auth.user_id, id)
        .await?
        .map(Json)
        .ok_or_else(board_not_found)
}

/// Partially updates a board
///
/// An empty body returns the board unchanged.
pub async fn update_board(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBoardRequest>,
) -> ApiResult<Json<Board>> {
    req.validate()?;

    let update: UpdateBoard = req.into();
    let board = if update.is_empty() {
        state.store.find_board(auth.user_id, id).await?
    } else {
        state.store.update_board(auth.user_id, id, update).await?
    };

    board.map(Json).ok_or_else(board_not_found)
}

pub async fn delete_board(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !state.store.delete_board(auth.user_id, id).await? {
        return Err(board_not_found());
    }

    tracing::info!(user_id = %auth.user_id, board_id = %id, "Board deleted");
    Ok(StatusCode::NO_CONTENT)
}
