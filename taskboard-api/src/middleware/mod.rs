/// Middleware modules for the API server
///
/// - `auth`: resolves the access token (bearer header or cookie) into an
///   `AuthContext`
/// - `csrf`: double-submit CSRF check for cookie-authenticated requests
///
/// Layer order matters: `csrf` reads the `AuthContext` that `auth` inserts, so
/// `auth` must be the outer layer.

pub mod auth;
pub mod csrf;
