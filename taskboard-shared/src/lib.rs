//! # Taskboard Shared Library
//!
//! Domain types, storage, and authentication used by the Taskboard API server.
//!
//! ## Module Organization
//!
//! - `auth`: passwords, JWTs, CSRF and activation tokens, request authentication
//! - `db`: Postgres pool and embedded migrations
//! - `mail`: outbound mail transports
//! - `models`: users, boards, tasks, and their SQL
//! - `store`: repository traits with Postgres and in-memory implementations

pub mod auth;
pub mod db;
pub mod mail;
pub mod models;
pub mod store;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
