/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Login, registration, and token refresh
/// - `profile`: User profiles and account activation
/// - `boards`: Board CRUD
/// - `tasks`: Task CRUD nested under boards

pub mod auth;
pub mod boards;
pub mod health;
pub mod profile;
pub mod tasks;
