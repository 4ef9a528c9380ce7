/// Authentication endpoints
///
/// This module provides user authentication endpoints:
/// - Login
/// - Registration
/// - Token refresh
///
/// # Endpoints
///
/// - `POST /v1/auth/login` - Login, get tokens and auth cookies
/// - `POST /v1/auth/register` (also `POST /v1/profile`) - Register a pending user
/// - `POST /v1/token/refresh` - Exchange a refresh token for a new access token

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::{
        activation, credentials::validate_credentials, csrf::generate_csrf_token, jwt,
        middleware::read_cookie, password,
    },
    mail::activation_email,
    models::user::NewUser,
};
use validator::{Validate, ValidationError};

use crate::{
    app::AppState,
    cookies::AuthCookies,
    error::{ApiError, ApiResult},
    extract::Json,
};

/// Letters, digits, and `@ . + - _`
fn validate_username(username: &str) -> Result<(), ValidationError> {
    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));

    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("username");
        err.message = Some(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .into(),
        );
        Err(err)
    }
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub username: String,

    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,

    /// Keep the refresh cookie for the remember-me lifetime
    #[serde(default)]
    pub remember_me: bool,
}

/// Access and refresh tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginTokens {
    pub access_token: String,

    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginData {
    pub tokens: LoginTokens,

    pub csrf_token: String,

    pub remember_me: bool,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub detail: String,

    pub data: LoginData,
}

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1 to 150 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    /// Checked separately, since the rules depend on the username
    pub password: String,

    #[validate(length(max = 2048, message = "Bio must be at most 2048 characters"))]
    #[serde(default)]
    pub bio: Option<String>,
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub detail: String,

    pub message: String,
}

/// Refresh request
///
/// The refresh token may come in the body or in the refresh cookie.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Refresh response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token
    pub access: String,

    /// New CSRF token, also set as a cookie
    pub csrf_token: String,
}

/// Login endpoint
///
/// Authenticates a user and returns JWT tokens. The tokens are also set as
/// cookies together with a CSRF token, so browser clients never handle them.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {
///   "username": "ana",
///   "password": "correct horse",
///   "remember_me": true
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "detail": "Login successfully",
///   "data": {
///     "tokens": {"access_token": "eyJ...", "refresh_token": "eyJ..."},
///     "csrf_token": "9f2c...",
///     "remember_me": true
///   }
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown user or wrong password
/// - `403 Forbidden`: Account not activated
/// - `422 Unprocessable Entity`: Validation failed
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(HeaderMap, Json<LoginResponse>)> {
    req.validate()?;

    let user = validate_credentials(state.store.as_ref(), &req.username, &req.password)
        .await
        .map_err(|e| {
            tracing::info!(username = %req.username, reason = %e, "Login rejected");
            ApiError::from(e)
        })?;

    let tokens = jwt::issue_token_pair(user.id, &state.config.jwt.token_settings(), state.jwt_secret())?;
    let csrf_token = generate_csrf_token(user.id, state.jwt_secret())?;

    let headers = AuthCookies::for_login(
        &state.config.cookies,
        &state.config.jwt,
        &tokens.access_token,
        &tokens.refresh_token,
        &csrf_token,
        req.remember_me,
    )
    .into_headers()?;

    tracing::info!(user_id = %user.id, remember_me = req.remember_me, "User logged in");

    Ok((
        headers,
        Json(LoginResponse {
            detail: "Login successfully".to_string(),
            data: LoginData {
                tokens: LoginTokens {
                    access_token: tokens.access_token,
                    refresh_token: tokens.refresh_token,
                },
                csrf_token,
                remember_me: req.remember_me,
            },
        }),
    ))
}

/// Register a new user
///
/// Creates an inactive account and emails an activation link to it.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "username": "ana",
///   "email": "ana@example.com",
///   "password": "correct horse"
/// }
/// ```
///
/// # Response (201)
///
/// ```json
/// {
///   "detail": "User created successfully.",
///   "message": "Check your email to activate your account."
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Username or email already taken
/// - `422 Unprocessable Entity`: Validation failed
/// - `500 Internal Server Error`: Storage or mail failure. The account may
///   exist without an email having been sent.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    req.validate()?;
    password::validate_password(&req.password, &req.username)
        .map_err(|msg| ApiError::invalid_field("password", msg))?;

    // Fast path; the unique constraints still catch a racing insert
    if state.store.username_exists(&req.username).await? {
        return Err(ApiError::Conflict(
            "A user with that username already exists.".to_string(),
        ));
    }
    if state.store.email_exists(&req.email).await? {
        return Err(ApiError::Conflict(
            "A user with that email already exists.".to_string(),
        ));
    }

    let password_hash = password::hash_password_blocking(req.password).await?;

    let mut new_user = NewUser::pending(req.username, req.email, password_hash);
    new_user.bio = req.bio;
    let user = state.store.create_user(new_user).await?;

    let token = activation::make_token(&user, state.jwt_secret(), Utc::now())?;
    let link = format!(
        "{}/v1/profile/{}/activate/{}",
        state.config.api.public_base_url, user.id, token
    );

    state
        .mailer
        .send(activation_email(&user.email, &user.username, &link))
        .await
        .map_err(|e| {
            tracing::error!(user_id = %user.id, error = %e, "Activation email was not sent");
            ApiError::from(e)
        })?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            detail: "User created successfully.".to_string(),
            message: "Check your email to activate your account.".to_string(),
        }),
    ))
}

/// Token refresh endpoint
///
/// Exchanges a refresh token for a new access token. The refresh token is not
/// rotated. Resets the access and CSRF cookies.
///
/// # Endpoint
///
/// ```text
/// POST /v1/token/refresh
/// Content-Type: application/json
///
/// {"refresh": "eyJ..."}
/// ```
///
/// The body may be omitted when the refresh cookie is present.
///
/// # Response
///
/// ```json
/// {"access": "eyJ...", "csrf_token": "9f2c..."}
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Missing, invalid, or expired refresh token, or the
///   user is gone or inactive
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<(HeaderMap, Json<RefreshResponse>)> {
    let refresh_token = body
        .and_then(|Json(req)| req.refresh)
        .filter(|t| !t.is_empty())
        .or_else(|| read_cookie(&headers, &state.config.cookies.refresh_name))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Refresh token was not provided.".to_string()))?;

    let (claims, access) = jwt::refresh_access_token(
        &refresh_token,
        &state.config.jwt.token_settings(),
        state.jwt_secret(),
    )?;

    let user = state
        .store
        .find_user_by_id(claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::Unauthorized("User not found or inactive.".to_string()))?;

    let csrf_token = generate_csrf_token(user.id, state.jwt_secret())?;
    let cookie_headers =
        AuthCookies::for_refresh(&state.config.cookies, &state.config.jwt, &access, &csrf_token)
            .into_headers()?;

    tracing::debug!(user_id = %user.id, "Access token refreshed");

    Ok((cookie_headers, Json(RefreshResponse { access, csrf_token })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_characters() {
        assert!(validate_username("ana").is_ok());
        assert!(validate_username("ana.maria+tag@home-1_x").is_ok());
        assert!(validate_username("ana maria").is_err());
        assert!(validate_username("ana/maria").is_err());
    }

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            username: "ana".to_string(),
            email: "not-an-email".to_string(),
            password: "correct horse".to_string(),
            bio: None,
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));

        let req = RegisterRequest {
            username: "x".repeat(151),
            email: "ana@example.com".to_string(),
            password: "correct horse".to_string(),
            bio: None,
        };
        assert!(req.validate().is_err());

        let req = RegisterRequest {
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            password: "correct horse".to_string(),
            bio: Some("hello".to_string()),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_refresh_request_accepts_empty_object() {
        let req: RefreshRequest = serde_json::from_str("{}").unwrap();
        assert!(req.refresh.is_none());
    }
}
