//! Account administration and password lifecycle
//!
//! Administrative creation and password resets issue a temporary password
//! together with a one-time reset token whose SHA-256 digest is stored in
//! `password_resets`. Callers never grant or manage a role ranked above
//! their own.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::auth::authorization::{in_scope, require, require_grantable};
use crate::auth::middleware::AuthContext;
use crate::auth::password::{
    generate_reset_token, generate_temporary_password, hash_password, hash_reset_token,
    validate_password_strength, verify_password,
};
use crate::auth::permissions::Role;
use crate::error::StoreError;
use crate::models::{
    organization::Organization,
    password_reset::PasswordReset,
    user::{CreateUser, UpdateUser, User},
};

/// A user together with freshly issued one-time credentials
///
/// `temporary_password` and `reset_token` exist only here; the database
/// holds their digests.
#[derive(Debug, Clone)]
pub struct IssuedCredentials {
    pub user: User,
    pub temporary_password: String,
    pub reset_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Member
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub organization_code: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

pub(crate) fn validate_email(email: &str) -> Result<(), StoreError> {
    if email.trim().validate_email() {
        Ok(())
    } else {
        Err(StoreError::validation("Invalid email format"))
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::validation("Name is required"));
    }
    if name.chars().count() > 100 {
        return Err(StoreError::validation("Name must be at most 100 characters"));
    }
    Ok(())
}

/// Loads a user the caller may administer
///
/// Users outside the caller's scope are reported as missing. Users ranked
/// above the caller are visible but not manageable.
async fn managed_user(pool: &PgPool, viewer: &AuthContext, id: Uuid) -> Result<User, StoreError> {
    let user = User::find_by_id(pool, id)
        .await?
        .filter(|u| in_scope(viewer, u.organization_id))
        .ok_or(StoreError::NotFound("User"))?;

    require(user.role.rank() <= viewer.role.rank())?;

    Ok(user)
}

/// Users of the caller's active organization, or only the caller
pub async fn list_users(pool: &PgPool, viewer: &AuthContext) -> Result<Vec<User>, StoreError> {
    if viewer.permissions.users.view_all {
        return Ok(User::list_by_organization(pool, viewer.organization_id).await?);
    }

    Ok(User::find_by_id(pool, viewer.user_id)
        .await?
        .into_iter()
        .collect())
}

/// Creates a user in the caller's active organization
///
/// The account starts with `first_login_completed = false`; the user,
/// and its reset record are written in one transaction.
pub async fn create_user(
    pool: &PgPool,
    viewer: &AuthContext,
    input: NewUser,
) -> Result<IssuedCredentials, StoreError> {
    require(viewer.permissions.users.create)?;
    require_grantable(viewer, input.role)?;
    validate_name(&input.name)?;
    validate_email(&input.email)?;

    if User::email_exists(pool, &input.email).await? {
        return Err(StoreError::Conflict("Email already registered".to_string()));
    }

    let temporary_password = generate_temporary_password();
    let password_hash = hash_password(&temporary_password)?;
    let (reset_token, reset_digest) = generate_reset_token();

    let mut tx = pool.begin().await?;

    let user = User::create(
        &mut *tx,
        CreateUser {
            organization_id: viewer.organization_id,
            name: input.name,
            email: input.email,
            password_hash,
            role: input.role,
            first_login_completed: false,
        },
    )
    .await?;

    PasswordReset::create(&mut *tx, user.id, &reset_digest).await?;

    tx.commit().await?;

    info!(user_id = %user.id, role = %user.role, created_by = %viewer.user_id, "User created");

    Ok(IssuedCredentials {
        user,
        temporary_password,
        reset_token,
    })
}

pub async fn update_user(
    pool: &PgPool,
    viewer: &AuthContext,
    id: Uuid,
    patch: UpdateUser,
) -> Result<User, StoreError> {
    require(viewer.permissions.users.edit)?;
    let current = managed_user(pool, viewer, id).await?;

    if let Some(name) = &patch.name {
        validate_name(name)?;
    }
    if let Some(role) = patch.role {
        require_grantable(viewer, role)?;
        if id == viewer.user_id && role != current.role {
            return Err(StoreError::validation("You cannot change your own role"));
        }
    }

    if patch.is_empty() {
        return Ok(current);
    }

    User::update(pool, id, patch)
        .await?
        .ok_or(StoreError::NotFound("User"))
}

/// Soft delete; the account keeps its tasks and assignments
pub async fn deactivate_user(
    pool: &PgPool,
    viewer: &AuthContext,
    id: Uuid,
) -> Result<User, StoreError> {
    require(viewer.permissions.users.edit)?;
    if id == viewer.user_id {
        return Err(StoreError::validation("You cannot deactivate your own account"));
    }
    managed_user(pool, viewer, id).await?;

    let user = User::set_active(pool, id, false)
        .await?
        .ok_or(StoreError::NotFound("User"))?;

    info!(user_id = %id, by = %viewer.user_id, "User deactivated");

    Ok(user)
}

/// Hard delete; see [`User::purge`]
pub async fn purge_user(pool: &PgPool, viewer: &AuthContext, id: Uuid) -> Result<(), StoreError> {
    require(viewer.permissions.users.delete)?;
    if id == viewer.user_id {
        return Err(StoreError::validation("You cannot delete your own account"));
    }
    managed_user(pool, viewer, id).await?;

    if !User::purge(pool, id).await? {
        return Err(StoreError::NotFound("User"));
    }

    info!(user_id = %id, by = %viewer.user_id, "User purged");

    Ok(())
}

/// Replaces a user's password with a new temporary one
pub async fn reset_user_password(
    pool: &PgPool,
    viewer: &AuthContext,
    id: Uuid,
) -> Result<IssuedCredentials, StoreError> {
    require(viewer.permissions.users.reset_password)?;
    let user = managed_user(pool, viewer, id).await?;

    let temporary_password = generate_temporary_password();
    let password_hash = hash_password(&temporary_password)?;
    let (reset_token, reset_digest) = generate_reset_token();

    let mut tx = pool.begin().await?;
    User::set_password(&mut *tx, id, &password_hash, false).await?;
    PasswordReset::create(&mut *tx, id, &reset_digest).await?;
    tx.commit().await?;

    info!(user_id = %id, by = %viewer.user_id, "Password reset issued");

    Ok(IssuedCredentials {
        user: User {
            first_login_completed: false,
            ..user
        },
        temporary_password,
        reset_token,
    })
}

/// Changes the caller's own password and completes first login
pub async fn change_password(
    pool: &PgPool,
    user_id: Uuid,
    current_password: &str,
    new_password: &str,
) -> Result<(), StoreError> {
    let user = User::find_by_id(pool, user_id)
        .await?
        .filter(|u| u.active)
        .ok_or(StoreError::NotFound("User"))?;

    if !verify_password(current_password, &user.password_hash)? {
        return Err(StoreError::validation("Current password is incorrect"));
    }
    validate_password_strength(new_password).map_err(StoreError::Validation)?;

    let password_hash = hash_password(new_password)?;
    User::set_password(pool, user_id, &password_hash, true).await?;

    info!(user_id = %user_id, "Password changed");

    Ok(())
}

/// Consumes a one-time reset token and sets a new password
pub async fn reset_password_with_token(
    pool: &PgPool,
    token: &str,
    new_password: &str,
) -> Result<(), StoreError> {
    validate_password_strength(new_password).map_err(StoreError::Validation)?;
    let password_hash = hash_password(new_password)?;

    let mut tx = pool.begin().await?;

    let reset = PasswordReset::find_valid(&mut *tx, &hash_reset_token(token.trim()))
        .await?
        .ok_or_else(|| StoreError::validation("Invalid or expired reset token"))?;

    User::set_password(&mut *tx, reset.user_id, &password_hash, true).await?;
    PasswordReset::mark_used(&mut *tx, reset.id).await?;

    tx.commit().await?;

    info!(user_id = %reset.user_id, "Password reset completed");

    Ok(())
}

/// Self-registration as a member of an active organization
pub async fn register(pool: &PgPool, input: Registration) -> Result<User, StoreError> {
    validate_name(&input.name)?;
    validate_email(&input.email)?;
    validate_password_strength(&input.password).map_err(StoreError::Validation)?;

    let organization = Organization::find_by_code(pool, &input.organization_code)
        .await?
        .filter(|org| org.active)
        .ok_or(StoreError::NotFound("Organization"))?;

    if User::email_exists(pool, &input.email).await? {
        return Err(StoreError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash_password(&input.password)?;

    let user = User::create(
        pool,
        CreateUser {
            organization_id: organization.id,
            name: input.name,
            email: input.email,
            password_hash,
            role: Role::Member,
            first_login_completed: true,
        },
    )
    .await?;

    info!(user_id = %user.id, organization_id = %organization.id, "User registered");

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ana@school.test").is_ok());
        assert!(validate_email("  ana@school.test ").is_ok());
        assert!(validate_email("ana").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Ana").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_new_user_defaults_to_member() {
        let input: NewUser = serde_json::from_value(serde_json::json!({
            "name": "Luis",
            "email": "luis@school.test"
        }))
        .unwrap();
        assert_eq!(input.role, Role::Member);

        let input: NewUser = serde_json::from_value(serde_json::json!({
            "name": "Luis",
            "email": "luis@school.test",
            "role": "coordinator"
        }))
        .unwrap();
        assert_eq!(input.role, Role::Coordinator);
    }
}
