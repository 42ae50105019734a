/// API route handlers
///
/// - `health`: health check
/// - `auth`: login, registration, session and password endpoints
/// - `tasks`: task CRUD, status, assignees and history
/// - `users`: user administration
/// - `organizations`: organization registry

pub mod auth;
pub mod health;
pub mod organizations;
pub mod tasks;
pub mod users;
