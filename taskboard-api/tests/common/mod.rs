//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - An application backed by the in-memory store and a recording mailer
//! - Test user creation
//! - Login helpers that return the issued tokens and cookies
//! - Request and response helpers

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use serde_json::Value;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::Config;
use taskboard_shared::auth::password::hash_password;
use taskboard_shared::mail::RecordingMailer;
use taskboard_shared::models::user::{NewUser, User};
use taskboard_shared::store::memory::MemoryStore;
use taskboard_shared::store::UserRepository;
use tower::Service as _;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

pub const PASSWORD: &str = "correct horse battery";

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub config: Config,
}

/// Tokens and cookies from a successful login
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    pub csrf_token: String,
}

impl Session {
    /// `Authorization` header value
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// `Cookie` header value carrying the access and CSRF cookies
    pub fn cookies(&self) -> String {
        format!(
            "access_token={}; csrftoken={}",
            self.access_token, self.csrf_token
        )
    }
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgresql://unused/test".to_string()),
        "JWT_SECRET" => Some(JWT_SECRET.to_string()),
        "PUBLIC_BASE_URL" => Some("http://testserver".to_string()),
        _ => None,
    })
    .expect("test config should load")
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_mailer(RecordingMailer::new())
    }

    pub fn with_mailer(mailer: RecordingMailer) -> Self {
        let config = test_config();
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(mailer);

        let state = AppState::new(store.clone(), mailer.clone(), config.clone());
        let app = build_router(state);

        TestContext {
            app,
            store,
            mailer,
            config,
        }
    }

    /// Creates a user directly in the store
    pub async fn create_user(&self, username: &str, active: bool) -> User {
        let hash = hash_password(PASSWORD).expect("hashing should succeed");
        let user = self
            .store
            .create_user(NewUser::pending(
                username.to_string(),
                format!("{}@example.com", username),
                hash,
            ))
            .await
            .expect("user should be created");

        if active {
            assert!(self.store.activate_user(user.id).await.unwrap());
        }

        self.store.find_user_by_id(user.id).await.unwrap().unwrap()
    }

    /// Creates an active user and logs in
    pub async fn login_as(&self, username: &str) -> Session {
        let user = self.create_user(username, true).await;

        let response = self
            .send(
                "POST",
                "/v1/auth/login",
                Some(serde_json::json!({"username": username, "password": PASSWORD})),
                &[],
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let data = &body["data"];

        Session {
            user,
            access_token: data["tokens"]["access_token"].as_str().unwrap().to_string(),
            refresh_token: data["tokens"]["refresh_token"].as_str().unwrap().to_string(),
            csrf_token: data["csrf_token"].as_str().unwrap().to_string(),
        }
    }

    /// Sends one request through the router
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, String)],
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, value.as_str());
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.app.clone().call(request).await.unwrap()
    }

    /// Sends a JSON-typed request with a raw, possibly malformed, body
    pub async fn send_raw(
        &self,
        method: &str,
        uri: &str,
        body: &'static str,
        headers: &[(&str, String)],
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, value.as_str());
        }

        let request = builder.body(Body::from(body)).unwrap();
        self.app.clone().call(request).await.unwrap()
    }

    /// Request authenticated with the bearer header
    pub async fn send_bearer(
        &self,
        session: &Session,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        self.send(method, uri, body, &[("authorization", session.bearer())])
            .await
    }

    /// Request authenticated with cookies, echoing the CSRF token in the header
    pub async fn send_cookie(
        &self,
        session: &Session,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> Response<Body> {
        self.send(
            method,
            uri,
            body,
            &[
                ("cookie", session.cookies()),
                ("x-csrftoken", session.csrf_token.clone()),
            ],
        )
        .await
    }

    /// Path of the activation link in the most recent email
    pub async fn last_activation_path(&self) -> String {
        let sent = self.mailer.sent().await;
        let email = sent.last().expect("an email should have been sent");

        let start = email
            .body
            .find("/v1/profile/")
            .expect("email should contain an activation link");
        email.body[start..]
            .split_whitespace()
            .next()
            .unwrap()
            .to_string()
    }
}

/// Reads a JSON response body
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// All `Set-Cookie` header values
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}
