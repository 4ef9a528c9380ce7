//! # Taskboard API Server Library
//!
//! HTTP API for boards and tasks, with JWT authentication carried either in
//! a bearer header or in cookies guarded by a CSRF token.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `bootstrap`: Superuser provisioning at startup
//! - `config`: Configuration management
//! - `cookies`: Auth cookie formatting
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Request extractors that reject with `ApiError`
//! - `middleware`: Authentication and CSRF layers
//! - `routes`: API route handlers

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod cookies;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
