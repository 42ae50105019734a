//! Task visibility
//!
//! Decides whether an identity may see a task. The decision depends only on
//! the task's organization, creator, privacy flag and assignees, and on the
//! viewer's id, active organization, role and permission set:
//!
//! 1. the creator and every assignee always see the task;
//! 2. a task in another organization is visible only to the super-tenant role;
//! 3. a non-private task is visible to its whole organization;
//! 4. a private task is visible only to roles with `tasks.view_private`.
//!
//! Callers treat "not visible" exactly like "does not exist".

use uuid::Uuid;

use crate::auth::middleware::AuthContext;
use crate::models::task::Task;

/// The task attributes visibility depends on
#[derive(Debug, Clone, Copy)]
pub struct TaskAccess<'a> {
    pub organization_id: Uuid,
    pub created_by: Uuid,
    pub is_private: bool,
    pub assignees: &'a [Uuid],
}

impl<'a> TaskAccess<'a> {
    pub fn of(task: &Task, assignees: &'a [Uuid]) -> Self {
        Self {
            organization_id: task.organization_id,
            created_by: task.created_by,
            is_private: task.is_private,
            assignees,
        }
    }

    /// Creator or assignee
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.created_by == user_id || self.assignees.contains(&user_id)
    }
}

pub fn is_visible(task: &TaskAccess<'_>, viewer: &AuthContext) -> bool {
    if task.is_participant(viewer.user_id) {
        return true;
    }

    if task.organization_id != viewer.organization_id {
        return viewer.role.is_super_tenant();
    }

    !task.is_private || viewer.permissions.tasks.view_private
}

/// Keeps the tasks `viewer` may see, preserving order
pub fn filter_visible<T, F>(items: Vec<T>, viewer: &AuthContext, access: F) -> Vec<T>
where
    F: Fn(&T) -> TaskAccess<'_>,
{
    items
        .into_iter()
        .filter(|item| is_visible(&access(item), viewer))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::permissions::Role;

    fn viewer(role: Role, org: Uuid) -> AuthContext {
        AuthContext::new(Uuid::new_v4(), org, role, "v@school.test")
    }

    #[test]
    fn test_same_org_public_visible_to_member() {
        let org = Uuid::new_v4();
        let task = TaskAccess {
            organization_id: org,
            created_by: Uuid::new_v4(),
            is_private: false,
            assignees: &[],
        };
        assert!(is_visible(&task, &viewer(Role::Member, org)));
    }

    #[test]
    fn test_private_task_rules() {
        let org = Uuid::new_v4();
        let member = viewer(Role::Member, org);
        let assignees = [member.user_id];

        let private = TaskAccess {
            organization_id: org,
            created_by: Uuid::new_v4(),
            is_private: true,
            assignees: &[],
        };
        assert!(!is_visible(&private, &member));
        assert!(!is_visible(&private, &viewer(Role::Coordinator, org)));
        assert!(is_visible(&private, &viewer(Role::Admin, org)));

        let assigned = TaskAccess {
            assignees: &assignees,
            ..private
        };
        assert!(is_visible(&assigned, &member));

        let own = TaskAccess {
            created_by: member.user_id,
            ..private
        };
        assert!(is_visible(&own, &member));
    }

    #[test]
    fn test_other_org_only_super_admin() {
        let task = TaskAccess {
            organization_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            is_private: false,
            assignees: &[],
        };
        let home = Uuid::new_v4();

        assert!(!is_visible(&task, &viewer(Role::Admin, home)));
        assert!(!is_visible(&task, &viewer(Role::TenantAdmin, home)));
        assert!(is_visible(&task, &viewer(Role::SuperAdmin, home)));
    }

    #[test]
    fn test_filter_visible_preserves_order() {
        let org = Uuid::new_v4();
        let member = viewer(Role::Member, org);
        let tasks = vec![(1, false), (2, true), (3, false)];

        let kept = filter_visible(tasks, &member, |(_, private)| TaskAccess {
            organization_id: org,
            created_by: Uuid::nil(),
            is_private: *private,
            assignees: &[],
        });

        assert_eq!(kept, vec![(1, false), (3, false)]);
    }
}
