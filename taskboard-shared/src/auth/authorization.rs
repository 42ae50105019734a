/// Authorization guards
///
/// Small checks shared by the store modules. Each returns `Ok(())` or an
/// [`AuthzError`]; callers run them before any database write.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::authorization::{require, AuthzError};
/// use taskboard_shared::auth::middleware::AuthContext;
/// use taskboard_shared::auth::permissions::Role;
/// use uuid::Uuid;
///
/// let ctx = AuthContext::new(Uuid::new_v4(), Uuid::new_v4(), Role::Member, "m@x.test");
/// assert!(require(ctx.permissions.tasks.create).is_ok());
/// assert!(matches!(require(ctx.permissions.users.create), Err(AuthzError::InsufficientPermissions)));
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use super::permissions::Role;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Role {0} cannot be granted by this account")]
    RoleNotGrantable(Role),
}

/// Fails unless `allowed`
pub fn require(allowed: bool) -> Result<(), AuthzError> {
    if allowed {
        Ok(())
    } else {
        Err(AuthzError::InsufficientPermissions)
    }
}

/// Whether `ctx` may act on records of `organization_id`
///
/// The session's active organization always qualifies; any other one only
/// for the super-tenant role.
pub fn in_scope(ctx: &AuthContext, organization_id: Uuid) -> bool {
    ctx.organization_id == organization_id || ctx.role.is_super_tenant()
}

/// `ctx` may give `target` to another account, or take it away from one
pub fn require_grantable(ctx: &AuthContext, target: Role) -> Result<(), AuthzError> {
    if ctx.role.can_grant(target) {
        Ok(())
    } else {
        Err(AuthzError::RoleNotGrantable(target))
    }
}
