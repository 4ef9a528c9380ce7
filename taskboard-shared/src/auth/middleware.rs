/// Request authentication
///
/// A request can authenticate in one of two ways:
///
/// 1. **Bearer header**: `Authorization: Bearer <access token>`
/// 2. **Cookie**: the access token in the access cookie (default `access_token`)
///
/// The header wins when both are present. Authentication validates the access
/// token, loads the user, and requires the account to be active. The result is
/// an [`AuthContext`] placed in the request extensions, which handlers pull out
/// with the [`AuthContext`] extractor.
///
/// The method matters downstream: only cookie-authenticated requests are
/// subject to CSRF checks.
///
/// # Example
///
/// ```no_run
/// use axum::{routing::get, Router};
/// use taskboard_shared::auth::middleware::AuthContext;
///
/// async fn whoami(auth: AuthContext) -> String {
///     auth.user_id.to_string()
/// }
///
/// let app: Router = Router::new().route("/whoami", get(whoami));
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use crate::store::UserRepository;

/// How a request was authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// `Authorization: Bearer` header
    Bearer,

    /// Access token cookie
    Cookie,
}

/// The authenticated user for the current request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,

    pub username: String,

    pub method: AuthMethod,
}

/// Authentication failure
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Neither header nor cookie carried a token
    #[error("Authentication credentials were not provided.")]
    MissingCredentials,

    /// Authorization header present but not a bearer token
    #[error("{0}")]
    InvalidFormat(String),

    /// Token failed validation
    #[error("{0}")]
    InvalidToken(String),

    /// Token is valid but the user is gone or inactive
    #[error("User not found or inactive.")]
    InactiveUser,

    #[error("Internal server error")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = match status {
            StatusCode::BAD_REQUEST => "bad_request",
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = ?self, "Authentication failed with an internal error");
                "internal_error"
            }
            _ => "unauthorized",
        };

        (status, Json(json!({ "error": code, "detail": self.to_string() }))).into_response()
    }
}

/// Reads one cookie value from the `Cookie` headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// Picks the access token off a request
///
/// Returns the token and the method it arrived by.
pub fn extract_access_token(
    headers: &HeaderMap,
    access_cookie: &str,
) -> Result<(String, AuthMethod), AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| AuthError::InvalidFormat("Invalid Authorization header".to_string()))?;

        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

        return Ok((token.to_string(), AuthMethod::Bearer));
    }

    read_cookie(headers, access_cookie)
        .filter(|t| !t.is_empty())
        .map(|t| (t, AuthMethod::Cookie))
        .ok_or(AuthError::MissingCredentials)
}

/// Authenticates a request from its headers
pub async fn authenticate_headers<R>(
    users: &R,
    headers: &HeaderMap,
    access_cookie: &str,
    secret: &str,
) -> Result<AuthContext, AuthError>
where
    R: UserRepository + ?Sized,
{
    let (token, method) = extract_access_token(headers, access_cookie)?;

    let claims = validate_access_token(&token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
        JwtError::WrongTokenType { .. } => {
            AuthError::InvalidToken("Token is not an access token".to_string())
        }
        _ => AuthError::InvalidToken("Invalid token".to_string()),
    })?;

    let user = users
        .find_user_by_id(claims.sub)
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .filter(|u| u.is_active)
        .ok_or(AuthError::InactiveUser)?;

    Ok(AuthContext {
        user_id: user.id,
        username: user.username,
        method,
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}
