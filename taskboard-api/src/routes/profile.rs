/// Profile endpoints
///
/// - `GET /v1/profile` - List profiles (authenticated)
/// - `GET /v1/profile/:id` - One profile (authenticated)
/// - `GET /v1/profile/:id/activate/:token` - Activate an account from the emailed link
///
/// Profiles are the serialized [`User`] and never include the password hash.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::{activation::activate_account, middleware::AuthContext},
    models::user::User,
};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, Path, Query},
};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

/// Pagination for the profile list
#[derive(Debug, Default, Deserialize)]
pub struct ListProfilesQuery {
    pub limit: Option<i64>,

    pub offset: Option<i64>,
}

impl ListProfilesQuery {
    fn bounds(&self) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivateResponse {
    pub detail: String,
}

pub async fn list_profiles(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(query): Query<ListProfilesQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let (limit, offset) = query.bounds();
    let users = state.store.list_users(limit, offset).await?;

    Ok(Json(users))
}

pub async fn get_profile(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    state
        .store
        .find_user_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))
}

/// Activates an account
///
/// # Errors
///
/// - `404 Not Found`: No such user
/// - `400 Bad Request`: Token is wrong, expired, or already used
pub async fn activate(
    State(state): State<AppState>,
    Path((id, token)): Path<(Uuid, String)>,
) -> ApiResult<Json<ActivateResponse>> {
    activate_account(
        state.store.as_ref(),
        id,
        &token,
        state.jwt_secret(),
        state.config.jwt.activation_timeout,
    )
    .await?;

    Ok(Json(ActivateResponse {
        detail: "Account has been activated.".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        assert_eq!(ListProfilesQuery::default().bounds(), (50, 0));

        let query = ListProfilesQuery {
            limit: Some(1000),
            offset: Some(-5),
        };
        assert_eq!(query.bounds(), (100, 0));

        let query = ListProfilesQuery {
            limit: Some(0),
            offset: Some(20),
        };
        assert_eq!(query.bounds(), (1, 20));
    }
}
