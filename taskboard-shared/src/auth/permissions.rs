/// Role-based permission resolver
///
/// Every identity carries exactly one [`Role`]. The role is resolved into a
/// fixed-shape [`PermissionSet`] which handlers consult before touching the
/// database, and which is returned to clients from `GET /v1/auth/me` so the
/// UI can gate actions without duplicating role rules.
///
/// # Role Ladder
///
/// | Role          | Scope                                               |
/// |---------------|-----------------------------------------------------|
/// | `member`      | Own tasks, tasks assigned to them, public org tasks |
/// | `coordinator` | Org-wide task view, due-date edits, reports         |
/// | `admin`       | Full task control, user administration in own org   |
/// | `tenant_admin`| Admin plus purge, cross-org reports, org switching  |
/// | `super_admin` | Everything, across every organization               |
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::permissions::{permissions_for, Role};
///
/// let perms = permissions_for(Role::Coordinator);
/// assert!(perms.tasks.view_all_in_org);
/// assert!(!perms.tasks.delete);
/// assert_eq!(perms.users.reset_password, Role::Coordinator.can_reset_passwords());
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of identity roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Coordinator,
    Admin,
    TenantAdmin,
    SuperAdmin,
}

impl Role {
    /// Every role, lowest privilege first
    pub const ALL: [Role; 5] = [
        Role::Member,
        Role::Coordinator,
        Role::Admin,
        Role::TenantAdmin,
        Role::SuperAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Coordinator => "coordinator",
            Role::Admin => "admin",
            Role::TenantAdmin => "tenant_admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Position on the role ladder (higher is more privileged)
    pub fn rank(&self) -> u8 {
        match self {
            Role::Member => 1,
            Role::Coordinator => 2,
            Role::Admin => 3,
            Role::TenantAdmin => 4,
            Role::SuperAdmin => 5,
        }
    }

    /// Admin-class roles: full task control within their scope
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Admin | Role::TenantAdmin | Role::SuperAdmin)
    }

    /// The only role whose visibility crosses organization boundaries
    pub fn is_super_tenant(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }

    /// Create and edit user accounts
    pub fn can_manage_users(&self) -> bool {
        matches!(self, Role::Admin | Role::TenantAdmin | Role::SuperAdmin)
    }

    /// Hard-delete user accounts
    pub fn can_purge_users(&self) -> bool {
        matches!(self, Role::TenantAdmin | Role::SuperAdmin)
    }

    pub fn can_reset_passwords(&self) -> bool {
        matches!(self, Role::Admin | Role::TenantAdmin | Role::SuperAdmin)
    }

    pub fn can_edit_task_due_date(&self) -> bool {
        matches!(
            self,
            Role::Coordinator | Role::Admin | Role::TenantAdmin | Role::SuperAdmin
        )
    }

    pub fn can_view_all_org_tasks(&self) -> bool {
        matches!(
            self,
            Role::Coordinator | Role::Admin | Role::TenantAdmin | Role::SuperAdmin
        )
    }

    pub fn can_view_private_tasks(&self) -> bool {
        matches!(self, Role::Admin | Role::TenantAdmin | Role::SuperAdmin)
    }

    pub fn can_delete_tasks(&self) -> bool {
        matches!(self, Role::Admin | Role::TenantAdmin | Role::SuperAdmin)
    }

    pub fn can_view_reports(&self) -> bool {
        !matches!(self, Role::Member)
    }

    pub fn can_view_cross_org_reports(&self) -> bool {
        matches!(self, Role::TenantAdmin | Role::SuperAdmin)
    }

    pub fn can_manage_org_settings(&self) -> bool {
        matches!(self, Role::Admin | Role::TenantAdmin | Role::SuperAdmin)
    }

    pub fn can_switch_organization(&self) -> bool {
        matches!(self, Role::TenantAdmin | Role::SuperAdmin)
    }

    /// Organization bootstrap (create org + first admin)
    pub fn can_create_organizations(&self) -> bool {
        matches!(self, Role::TenantAdmin | Role::SuperAdmin)
    }

    /// Whether this role may hand `target` to another identity.
    ///
    /// Only user managers may assign roles, and never above their own rank.
    pub fn can_grant(&self, target: Role) -> bool {
        self.can_manage_users() && target.rank() <= self.rank()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role name is not one of the closed set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "coordinator" => Ok(Role::Coordinator),
            "admin" => Ok(Role::Admin),
            "tenant_admin" => Ok(Role::TenantAdmin),
            "super_admin" => Ok(Role::SuperAdmin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPermissions {
    pub create: bool,
    pub edit: bool,
    pub delete: bool,
    pub edit_due_date: bool,
    pub view_all_in_org: bool,
    pub view_private: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermissions {
    pub create: bool,
    pub edit: bool,
    pub delete: bool,
    pub view_all: bool,
    pub reset_password: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPermissions {
    pub view: bool,
    pub export: bool,
    pub view_cross_organization: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationPermissions {
    pub manage_settings: bool,
    pub view_settings: bool,
    pub switch_organization: bool,
}

/// Capabilities granted to a role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    pub tasks: TaskPermissions,
    pub users: UserPermissions,
    pub reports: ReportPermissions,
    pub organization: OrganizationPermissions,
}

impl PermissionSet {
    /// Create-own-task only. Used for role names outside the closed set.
    pub fn minimal() -> Self {
        Self {
            tasks: TaskPermissions {
                create: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Resolves the permission set for a role
///
/// Total over [`Role`] and free of side effects; the same role always
/// yields an identical set.
pub fn permissions_for(role: Role) -> PermissionSet {
    PermissionSet {
        tasks: TaskPermissions {
            create: true,
            edit: role.is_elevated(),
            delete: role.can_delete_tasks(),
            edit_due_date: role.can_edit_task_due_date(),
            view_all_in_org: role.can_view_all_org_tasks(),
            view_private: role.can_view_private_tasks(),
        },
        users: UserPermissions {
            create: role.can_manage_users(),
            edit: role.can_manage_users(),
            delete: role.can_purge_users(),
            view_all: role.can_view_all_org_tasks(),
            reset_password: role.can_reset_passwords(),
        },
        reports: ReportPermissions {
            view: role.can_view_reports(),
            export: role.can_view_reports(),
            view_cross_organization: role.can_view_cross_org_reports(),
        },
        organization: OrganizationPermissions {
            manage_settings: role.can_manage_org_settings(),
            view_settings: true,
            switch_organization: role.can_switch_organization(),
        },
    }
}

/// Resolves a possibly missing or unrecognized role name
///
/// Anything that does not parse as a [`Role`] gets [`PermissionSet::minimal`].
pub fn permissions_for_name(role: Option<&str>) -> PermissionSet {
    match role.map(str::parse::<Role>) {
        Some(Ok(role)) => permissions_for(role),
        _ => PermissionSet::minimal(),
    }
}
