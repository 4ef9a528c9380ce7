/// CSRF protection for cookie-authenticated requests
///
/// Requests authenticated by the access cookie must echo the CSRF cookie in
/// the CSRF header (default `X-CSRFToken`) for every unsafe method. The token
/// must also carry a valid signature for the authenticated user. Bearer-header
/// requests are not subject to the check, since a browser never attaches that
/// header on its own.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use taskboard_shared::auth::{
    csrf::check_double_submit,
    middleware::{read_cookie, AuthContext, AuthMethod},
};

use crate::{app::AppState, error::ApiError};

/// GET, HEAD, OPTIONS, and TRACE never need a CSRF token
pub fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

pub async fn csrf_guard(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_safe_method(req.method()) {
        return Ok(next.run(req).await);
    }

    let auth = req
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or_else(|| ApiError::InternalError("CSRF guard ran before authentication".to_string()))?;

    if auth.method == AuthMethod::Bearer {
        return Ok(next.run(req).await);
    }

    let cookies = &state.config.cookies;
    let cookie = read_cookie(req.headers(), &cookies.csrf_name);
    let header = req
        .headers()
        .get(cookies.csrf_header.as_str())
        .and_then(|v| v.to_str().ok());

    if let Err(e) = check_double_submit(cookie.as_deref(), header, auth.user_id, state.jwt_secret()) {
        tracing::warn!(
            user_id = %auth.user_id,
            method = %req.method(),
            path = %req.uri().path(),
            reason = %e,
            "CSRF check failed"
        );
        return Err(e.into());
    }

    Ok(next.run(req).await)
}
