//! Error type for store-level operations
//!
//! Store functions (tasks, organizations, accounts) authorize and validate
//! before writing, and report failures through [`StoreError`]. The API crate
//! maps each variant to an HTTP status.

use crate::auth::authorization::AuthzError;
use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Input rejected before any write
    #[error("{0}")]
    Validation(String),

    #[error("Insufficient permissions")]
    Forbidden,

    /// Missing, or present but not visible to the caller
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] JwtError),
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation(message.into())
    }
}

impl From<sqlx::Error> for StoreError {
    /// Unique violations become [`StoreError::Conflict`]; everything else is
    /// a database error.
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return match db_err.constraint() {
                    Some("users_email_key") => {
                        StoreError::Conflict("Email already registered".to_string())
                    }
                    Some("organizations_code_key") => {
                        StoreError::Conflict("Organization code already exists".to_string())
                    }
                    _ => StoreError::Conflict("Resource already exists".to_string()),
                };
            }
        }

        StoreError::Database(err)
    }
}

impl From<AuthzError> for StoreError {
    fn from(_: AuthzError) -> Self {
        StoreError::Forbidden
    }
}
