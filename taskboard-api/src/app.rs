/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_api::{app::AppState, config::Config};
/// use taskboard_shared::mail::LogMailer;
/// use taskboard_shared::store::memory::MemoryStore;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(LogMailer), config);
/// let app = taskboard_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use taskboard_shared::{mail::Mailer, store::Store};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    config::Config,
    middleware::{auth::authenticate, csrf::csrf_guard},
    routes,
};

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is an `Arc`, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Users, boards, and tasks
    pub store: Arc<dyn Store>,

    /// Outbound mail
    pub mailer: Arc<dyn Mailer>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: Config) -> Self {
        Self {
            store,
            mailer,
            config: Arc::new(config),
        }
    }

    /// Secret that signs JWTs, CSRF tokens, and activation tokens
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                                  # public
/// └── /v1/
///     ├── POST /auth/login                         # public
///     ├── POST /auth/register                      # public
///     ├── POST /token/refresh                      # refresh token
///     ├── POST /profile                            # public, same as register
///     ├── GET  /profile/:id/activate/:token        # public
///     ├── GET  /profile, /profile/:id              # authenticated
///     ├── GET|POST /boards                         # authenticated
///     ├── GET|PATCH|DELETE /boards/:id             # authenticated
///     ├── GET|POST /boards/:board_id/tasks         # authenticated
///     └── GET|PATCH|DELETE /boards/:board_id/tasks/:id
/// ```
///
/// # Middleware Stack
///
/// Authenticated routes run `authenticate` and then `csrf_guard`. Everything
/// is wrapped in request tracing and CORS.
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_routes = Router::new()
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/register", post(routes::auth::register))
        .route("/token/refresh", post(routes::auth::refresh))
        .route("/profile", post(routes::auth::register))
        .route(
            "/profile/:id/activate/:token",
            get(routes::profile::activate),
        );

    // Layers run bottom-up: authenticate first, then the CSRF check
    let protected_routes = Router::new()
        .route("/profile", get(routes::profile::list_profiles))
        .route("/profile/:id", get(routes::profile::get_profile))
        .route(
            "/boards",
            get(routes::boards::list_boards).post(routes::boards::create_board),
        )
        .route(
            "/boards/:id",
            get(routes::boards::get_board)
                .patch(routes::boards::update_board)
                .delete(routes::boards::delete_board),
        )
        .route(
            "/boards/:board_id/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/boards/:board_id/tasks/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .layer(from_fn_with_state(state.clone(), csrf_guard))
        .layer(from_fn_with_state(state.clone(), authenticate));

    let v1_routes = public_routes.merge(protected_routes);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .with_state(state)
}

/// CORS: permissive when origins contain `*`, otherwise the listed origins
/// with credentials so browsers send the auth cookies
fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let mut allowed_headers = vec![header::AUTHORIZATION, header::CONTENT_TYPE];
    match HeaderName::from_bytes(config.cookies.csrf_header.as_bytes()) {
        Ok(name) => allowed_headers.push(name),
        Err(e) => tracing::warn!(
            header = %config.cookies.csrf_header,
            error = %e,
            "CSRF header name is not a valid header name"
        ),
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(allowed_headers)
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
