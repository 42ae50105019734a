//! Organization registry
//!
//! Listing, bootstrap, settings, deactivation and organization switching.
//! Bootstrap is the one multi-table write outside the task store: the
//! organization, its first admin and that admin's password-reset record are
//! inserted in a single transaction, so either all three exist afterwards or
//! none do.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::accounts::{validate_email, IssuedCredentials};
use crate::auth::authorization::{in_scope, require};
use crate::auth::middleware::AuthContext;
use crate::auth::password::{generate_reset_token, generate_temporary_password, hash_password};
use crate::auth::permissions::Role;
use crate::auth::session::{issue_session, Session};
use crate::error::StoreError;
use crate::models::{
    organization::{CreateOrganization, Organization, OrganizationSettings, OrganizationType},
    password_reset::PasswordReset,
    user::{CreateUser, User},
};

/// Organization plus the identity of its first administrator
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganization {
    pub name: String,
    pub code: String,
    #[serde(rename = "type", default = "default_type")]
    pub org_type: OrganizationType,
    #[serde(default)]
    pub settings: Option<OrganizationSettings>,
    pub admin_name: String,
    pub admin_email: String,
}

fn default_type() -> OrganizationType {
    OrganizationType::School
}

/// Result of [`create_organization`]
#[derive(Debug, Clone)]
pub struct CreatedOrganization {
    pub organization: Organization,
    pub admin: IssuedCredentials,
}

fn validate_code(code: &str) -> Result<(), StoreError> {
    let code = code.trim();
    if code.len() < 2 || code.len() > 32 {
        return Err(StoreError::validation(
            "Organization code must be 2 to 32 characters",
        ));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(StoreError::validation(
            "Organization code may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

/// All organizations for roles that may switch, otherwise only the caller's
pub async fn list_organizations(
    pool: &PgPool,
    viewer: &AuthContext,
) -> Result<Vec<Organization>, StoreError> {
    if viewer.permissions.organization.switch_organization || viewer.role.is_super_tenant() {
        return Ok(Organization::list_all(pool).await?);
    }

    Ok(Organization::find_by_id(pool, viewer.organization_id)
        .await?
        .into_iter()
        .collect())
}

pub async fn get_organization(
    pool: &PgPool,
    viewer: &AuthContext,
    id: Uuid,
) -> Result<Organization, StoreError> {
    let listable = in_scope(viewer, id) || viewer.permissions.organization.switch_organization;
    if !listable || !viewer.permissions.organization.view_settings {
        return Err(StoreError::NotFound("Organization"));
    }

    Organization::find_by_id(pool, id)
        .await?
        .ok_or(StoreError::NotFound("Organization"))
}

/// Creates an organization with its first admin
///
/// The admin gets a temporary password (returned in the result) and a
/// password-reset record; `first_login_completed` starts false.
///
/// # Errors
///
/// - `Forbidden` without the organization-creation tier
/// - `Validation` for malformed name, code or admin email
/// - `Conflict` when the code or the admin email is taken; nothing is
///   written in that case
pub async fn create_organization(
    pool: &PgPool,
    viewer: &AuthContext,
    input: NewOrganization,
) -> Result<CreatedOrganization, StoreError> {
    require(viewer.role.can_create_organizations())?;

    if input.name.trim().is_empty() {
        return Err(StoreError::validation("Organization name is required"));
    }
    validate_code(&input.code)?;
    validate_email(&input.admin_email)?;
    if input.admin_name.trim().is_empty() {
        return Err(StoreError::validation("Admin name is required"));
    }

    if Organization::code_exists(pool, &input.code).await? {
        return Err(StoreError::Conflict(
            "Organization code already exists".to_string(),
        ));
    }
    if User::email_exists(pool, &input.admin_email).await? {
        return Err(StoreError::Conflict("Email already registered".to_string()));
    }

    let temporary_password = generate_temporary_password();
    let password_hash = hash_password(&temporary_password)?;
    let (reset_token, reset_digest) = generate_reset_token();

    let mut tx = pool.begin().await?;

    let organization = Organization::create(
        &mut *tx,
        CreateOrganization {
            name: input.name,
            code: input.code,
            org_type: input.org_type,
            settings: input.settings.unwrap_or_default(),
        },
    )
    .await?;

    let admin = User::create(
        &mut *tx,
        CreateUser {
            organization_id: organization.id,
            name: input.admin_name,
            email: input.admin_email,
            password_hash,
            role: Role::Admin,
            first_login_completed: false,
        },
    )
    .await?;

    PasswordReset::create(&mut *tx, admin.id, &reset_digest).await?;

    tx.commit().await?;

    info!(
        organization_id = %organization.id,
        code = %organization.code,
        admin_id = %admin.id,
        created_by = %viewer.user_id,
        "Organization created"
    );

    Ok(CreatedOrganization {
        organization,
        admin: IssuedCredentials {
            user: admin,
            temporary_password,
            reset_token,
        },
    })
}

/// Marks an organization inactive; members can no longer sign in
pub async fn deactivate_organization(
    pool: &PgPool,
    viewer: &AuthContext,
    id: Uuid,
) -> Result<Organization, StoreError> {
    require(viewer.role.is_super_tenant())?;

    let organization = Organization::set_active(pool, id, false)
        .await?
        .ok_or(StoreError::NotFound("Organization"))?;

    info!(organization_id = %id, by = %viewer.user_id, "Organization deactivated");

    Ok(organization)
}

/// Replaces the settings blob
///
/// Requires `organization.manage_settings` and the organization to be in
/// the caller's scope.
pub async fn update_settings(
    pool: &PgPool,
    viewer: &AuthContext,
    id: Uuid,
    settings: OrganizationSettings,
) -> Result<Organization, StoreError> {
    require(viewer.permissions.organization.manage_settings && in_scope(viewer, id))?;

    Organization::update_settings(pool, id, settings)
        .await?
        .ok_or(StoreError::NotFound("Organization"))
}

/// Issues a new session scoped to another active organization
pub async fn switch_organization(
    pool: &PgPool,
    secret: &str,
    viewer: &AuthContext,
    organization_id: Uuid,
) -> Result<Session, StoreError> {
    require(viewer.permissions.organization.switch_organization)?;

    let organization = Organization::find_by_id(pool, organization_id)
        .await?
        .filter(|org| org.active)
        .ok_or(StoreError::NotFound("Organization"))?;

    let user = User::find_by_id(pool, viewer.user_id)
        .await?
        .ok_or(StoreError::NotFound("User"))?;

    info!(user_id = %user.id, organization_id = %organization.id, "Switched organization");

    Ok(issue_session(user, organization.id, secret)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_code() {
        assert!(validate_code("ESC-12").is_ok());
        assert!(validate_code("dept_math").is_ok());
        assert!(validate_code("x").is_err());
        assert!(validate_code("has space").is_err());
        assert!(validate_code(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_new_organization_defaults_to_school() {
        let input: NewOrganization = serde_json::from_value(serde_json::json!({
            "name": "Escuela 12",
            "code": "ESC-12",
            "adminName": "Rosa",
            "adminEmail": "rosa@esc12.test"
        }))
        .unwrap();

        assert_eq!(input.org_type, OrganizationType::School);
        assert_eq!(input.admin_email, "rosa@esc12.test");
        assert!(input.settings.is_none());
    }

    #[test]
    fn test_new_organization_type_field() {
        let input: NewOrganization = serde_json::from_value(serde_json::json!({
            "name": "Math",
            "code": "MATH",
            "type": "DEPARTMENT",
            "adminName": "Rosa",
            "adminEmail": "rosa@esc12.test"
        }))
        .unwrap();

        assert_eq!(input.org_type, OrganizationType::Department);
    }
}
