/// Request authentication
///
/// Turns an `Authorization: Bearer <token>` header into an [`AuthContext`].
/// Besides verifying the token this re-reads the user row, so a
/// deactivated account or a changed role takes effect on the next request
/// rather than when the token expires.
///
/// The API crate wraps [`authenticate_bearer`] in an axum middleware and
/// inserts the context into request extensions; handlers read it with
/// `Extension<AuthContext>`.

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use super::permissions::{permissions_for, PermissionSet, Role};
use crate::models::{organization::Organization, user::User};

/// Authenticated identity attached to every protected request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,

    /// Organization the session is scoped to. Equals the user's home
    /// organization unless they switched.
    pub organization_id: Uuid,

    pub role: Role,
    pub email: String,

    /// Resolved from `role`
    pub permissions: PermissionSet,
}

impl AuthContext {
    pub fn new(user_id: Uuid, organization_id: Uuid, role: Role, email: impl Into<String>) -> Self {
        Self {
            user_id,
            organization_id,
            role,
            email: email.into(),
            permissions: permissions_for(role),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("Expected Bearer token")]
    InvalidFormat,

    #[error("{0}")]
    InvalidToken(String),

    /// The account behind a valid token is gone or deactivated
    #[error("Account is not active")]
    AccountInactive,

    #[error("Organization is not active")]
    OrganizationInactive,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid token issuer".to_string()),
            _ => AuthError::InvalidToken("Invalid token".to_string()),
        }
    }
}

/// Extracts the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidFormat)
}

/// Verifies the bearer token and loads the current state of its user
///
/// # Errors
///
/// - missing/malformed header or bad token
/// - user deleted or deactivated since the token was issued
/// - session scoped to an organization the user may no longer act in
/// - that organization was deactivated
pub async fn authenticate_bearer(
    pool: &PgPool,
    secret: &str,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_token(token, secret)?;

    let user = User::find_by_id(pool, claims.sub)
        .await?
        .filter(|u| u.active)
        .ok_or(AuthError::AccountInactive)?;

    if claims.org_id != user.organization_id && !user.role.can_switch_organization() {
        debug!(user_id = %user.id, "Token scoped to foreign organization without switch permission");
        return Err(AuthError::InvalidToken("Invalid token".to_string()));
    }

    let organization_active = Organization::find_by_id(pool, claims.org_id)
        .await?
        .map(|org| org.active)
        .unwrap_or(false);

    if !organization_active {
        return Err(AuthError::OrganizationInactive);
    }

    Ok(AuthContext::new(user.id, claims.org_id, user.role, user.email))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_context_resolves_permissions() {
        let ctx = AuthContext::new(Uuid::new_v4(), Uuid::new_v4(), Role::Admin, "a@x.test");
        assert_eq!(ctx.permissions, permissions_for(Role::Admin));
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(AuthError::MissingCredentials)));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(bearer_token(&headers), Err(AuthError::InvalidFormat)));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(matches!(bearer_token(&headers), Err(AuthError::InvalidFormat)));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_jwt_errors_do_not_leak_detail() {
        let err: AuthError = JwtError::Invalid("InvalidSignature".to_string()).into();
        assert_eq!(err.to_string(), "Invalid token");

        let err: AuthError = JwtError::Expired.into();
        assert_eq!(err.to_string(), "Token expired");
    }
}
