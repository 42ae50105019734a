//! # Taskboard Shared Library
//!
//! Domain types, persistence, and authorization rules shared by the
//! Taskboard API server and client.
//!
//! ## Module Organization
//!
//! - `auth`: roles and permission sets, password hashing, session tokens
//! - `db`: connection pool and migrations
//! - `models`: database models and queries
//! - `tasks`: visibility, lifecycle and the authorized task store
//! - `registry`: organization bootstrap, settings and switching
//! - `accounts`: user administration and password lifecycle
//! - `error`: the store error type

pub mod accounts;
pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod registry;
pub mod tasks;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
