/// Authentication middleware
///
/// Validates the access token from the `Authorization: Bearer` header or the
/// access cookie, loads the user, and inserts an [`AuthContext`] into the
/// request extensions. Handlers take `AuthContext` as an extractor.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use taskboard_shared::auth::middleware::{authenticate_headers, AuthContext};

use crate::{app::AppState, error::ApiError};

pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth: AuthContext = authenticate_headers(
        state.store.as_ref(),
        req.headers(),
        &state.config.cookies.access_name,
        state.jwt_secret(),
    )
    .await
    .map_err(|e| {
        tracing::debug!(error = %e, path = %req.uri().path(), "Authentication failed");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
