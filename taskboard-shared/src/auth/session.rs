/// Session issuance
///
/// [`authenticate`] checks an email/password pair and issues a 24-hour
/// session token. Every credential failure (unknown email, deactivated
/// account, wrong password, unreadable digest) produces the same
/// [`LoginError::InvalidCredentials`], and the password check runs even when
/// no account matched, so responses do not reveal which accounts exist.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::jwt::{create_token, Claims, JwtError};
use super::password::{hash_password, verify_password};
use crate::models::{organization::Organization, user::User};

/// Issued session
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Organization is not active")]
    OrganizationInactive,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Token(#[from] JwtError),
}

/// Digest verified against when no account matched
fn decoy_digest() -> Option<&'static str> {
    static DECOY: OnceLock<Option<String>> = OnceLock::new();
    DECOY
        .get_or_init(|| hash_password("decoy-password-never-matches").ok())
        .as_deref()
}

fn password_matches(password: &str, user: Option<&User>) -> bool {
    match user {
        Some(user) => match verify_password(password, &user.password_hash) {
            Ok(matched) => matched,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Stored password digest is unreadable");
                false
            }
        },
        None => {
            if let Some(decoy) = decoy_digest() {
                let _ = verify_password(password, decoy);
            }
            false
        }
    }
}

/// Signs a session for `user` scoped to `organization_id`
pub fn issue_session(user: User, organization_id: Uuid, secret: &str) -> Result<Session, JwtError> {
    let claims = Claims::new(user.id, organization_id, user.role, user.email.clone());
    let token = create_token(&claims, secret)?;

    Ok(Session {
        expires_at: claims.expires_at(),
        user,
        token,
    })
}

/// Validates credentials and issues a session
///
/// The email is trimmed and lowercased before lookup. Recording the login
/// time is best-effort: a failed write is logged and the login still
/// succeeds.
///
/// # Errors
///
/// - [`LoginError::InvalidCredentials`] for any credential mismatch
/// - [`LoginError::OrganizationInactive`] when the user's organization is
///   deactivated (checked only after the password matched)
pub async fn authenticate(
    pool: &PgPool,
    secret: &str,
    email: &str,
    password: &str,
) -> Result<Session, LoginError> {
    let user = User::find_by_email(pool, email).await?;

    let matched = password_matches(password, user.as_ref());
    let user = match user {
        Some(user) if matched && user.active => user,
        _ => return Err(LoginError::InvalidCredentials),
    };

    let organization_active = Organization::find_by_id(pool, user.organization_id)
        .await?
        .map(|org| org.active)
        .unwrap_or(false);

    if !organization_active {
        return Err(LoginError::OrganizationInactive);
    }

    if let Err(e) = User::update_last_login(pool, user.id).await {
        warn!(user_id = %user.id, error = %e, "Failed to record last login");
    }

    info!(user_id = %user.id, role = %user.role, "User signed in");

    let organization_id = user.organization_id;
    issue_session(user, organization_id, secret).map_err(LoginError::from)
}
