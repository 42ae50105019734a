/// Property tests for the pure authorization and lifecycle rules
///
/// Run with: cargo test --test rules_properties

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use taskboard_shared::auth::middleware::AuthContext;
use taskboard_shared::auth::permissions::{permissions_for, permissions_for_name, PermissionSet, Role};
use taskboard_shared::models::task::{TaskPriority, TaskStatus, TaskWrite};
use taskboard_shared::tasks::lifecycle::transition;
use taskboard_shared::tasks::visibility::{is_visible, TaskAccess};
use uuid::Uuid;

fn role() -> impl Strategy<Value = Role> {
    prop::sample::select(Role::ALL.to_vec())
}

fn status() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(TaskStatus::ALL.to_vec())
}

/// Every status change the lifecycle allows
const ALLOWED_EDGES: [(TaskStatus, TaskStatus); 6] = [
    (TaskStatus::Pending, TaskStatus::InProgress),
    (TaskStatus::Pending, TaskStatus::Cancelled),
    (TaskStatus::InProgress, TaskStatus::Completed),
    (TaskStatus::InProgress, TaskStatus::Cancelled),
    (TaskStatus::Completed, TaskStatus::Pending),
    (TaskStatus::Completed, TaskStatus::InProgress),
];

fn allowed(from: TaskStatus, to: TaskStatus) -> bool {
    from == to || ALLOWED_EDGES.contains(&(from, to))
}

proptest! {
    #[test]
    fn resolver_is_deterministic(role in role()) {
        prop_assert_eq!(permissions_for(role), permissions_for(role));
        prop_assert_eq!(permissions_for_name(Some(role.as_str())), permissions_for(role));
    }

    #[test]
    fn unknown_role_names_get_minimal_set(name in "[a-z_]{0,16}") {
        prop_assume!(name.parse::<Role>().is_err());
        prop_assert_eq!(permissions_for_name(Some(&name)), PermissionSet::minimal());
    }

    #[test]
    fn predicates_agree_with_resolver(role in role()) {
        let p = permissions_for(role);

        prop_assert!(p.tasks.create);
        prop_assert_eq!(p.tasks.delete, role.can_delete_tasks());
        prop_assert_eq!(p.tasks.view_private, role.can_view_private_tasks());
        prop_assert_eq!(p.tasks.edit_due_date, role.can_edit_task_due_date());
        prop_assert_eq!(p.tasks.view_all_in_org, role.can_view_all_org_tasks());
        prop_assert_eq!(p.users.create, role.can_manage_users());
        prop_assert_eq!(p.users.delete, role.can_purge_users());
        prop_assert_eq!(p.users.reset_password, role.can_reset_passwords());
        prop_assert_eq!(p.reports.view, role.can_view_reports());
        prop_assert_eq!(p.reports.view_cross_organization, role.can_view_cross_org_reports());
        prop_assert_eq!(p.organization.manage_settings, role.can_manage_org_settings());
        prop_assert_eq!(p.organization.switch_organization, role.can_switch_organization());
    }

    #[test]
    fn higher_roles_never_lose_permissions(a in role(), b in role()) {
        prop_assume!(a.rank() <= b.rank());
        let (low, high) = (permissions_for(a), permissions_for(b));

        prop_assert!(!low.tasks.view_private || high.tasks.view_private);
        prop_assert!(!low.tasks.delete || high.tasks.delete);
        prop_assert!(!low.users.create || high.users.create);
        prop_assert!(!low.organization.switch_organization || high.organization.switch_organization);
    }

    #[test]
    fn grants_never_exceed_own_rank(granter in role(), target in role()) {
        if granter.can_grant(target) {
            prop_assert!(target.rank() <= granter.rank());
            prop_assert!(granter.can_manage_users());
        }
    }

    #[test]
    fn visibility_is_sound(
        viewer_role in role(),
        same_org in any::<bool>(),
        is_private in any::<bool>(),
        viewer_created in any::<bool>(),
        viewer_assigned in any::<bool>(),
    ) {
        let home = Uuid::new_v4();
        let viewer = AuthContext::new(Uuid::new_v4(), home, viewer_role, "v@taskboard.test");

        let assignees = if viewer_assigned { vec![viewer.user_id] } else { vec![Uuid::new_v4()] };
        let task = TaskAccess {
            organization_id: if same_org { home } else { Uuid::new_v4() },
            created_by: if viewer_created { viewer.user_id } else { Uuid::new_v4() },
            is_private,
            assignees: &assignees,
        };

        let visible = is_visible(&task, &viewer);
        let participant = viewer_created || viewer_assigned;

        if participant {
            prop_assert!(visible);
        } else if !same_org {
            prop_assert_eq!(visible, viewer_role.is_super_tenant());
        } else if is_private {
            prop_assert_eq!(visible, viewer.permissions.tasks.view_private);
        } else {
            prop_assert!(visible);
        }
    }

    #[test]
    fn transitions_keep_completed_at_in_lockstep(from in status(), to in status()) {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();
        let mut state = TaskWrite {
            title: "Task".to_string(),
            description: None,
            status: from,
            priority: TaskPriority::Medium,
            due_at: None,
            is_private: false,
            completed_at: (from == TaskStatus::Completed).then_some(now),
        };
        let before = state.clone();

        match transition(&mut state, to, now) {
            Ok(changed) => {
                prop_assert!(allowed(from, to), "{:?} -> {:?} was accepted", from, to);
                prop_assert_eq!(changed, from != to);
                prop_assert_eq!(state.status, to);
            }
            Err(_) => {
                prop_assert!(!allowed(from, to), "{:?} -> {:?} was rejected", from, to);
                prop_assert_eq!(&state, &before);
            }
        }

        prop_assert_eq!(state.completed_at.is_some(), state.status == TaskStatus::Completed);
    }

    #[test]
    fn transition_rule_matches_edge_table(from in status(), to in status()) {
        prop_assume!(from != to);
        prop_assert_eq!(from.can_transition_to(to), ALLOWED_EDGES.contains(&(from, to)));
    }
}
