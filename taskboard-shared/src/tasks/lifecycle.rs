//! Task lifecycle: who may change a task, and how its status may move
//!
//! Status moves are validated against [`TaskStatus::can_transition_to`].
//! `completed_at` is kept in lockstep: set when entering `completed`,
//! cleared when leaving it.

use chrono::{DateTime, Utc};

use super::visibility::TaskAccess;
use crate::auth::middleware::AuthContext;
use crate::models::task::{TaskStatus, TaskWrite};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("Cannot change status from {} to {}", .from.as_str(), .to.as_str())]
    IllegalTransition { from: TaskStatus, to: TaskStatus },
}

/// Edit, transition or reassign: creator, assignee, or `tasks.edit`
pub fn can_modify(task: &TaskAccess<'_>, actor: &AuthContext) -> bool {
    task.is_participant(actor.user_id) || actor.permissions.tasks.edit
}

/// Delete: creator or `tasks.delete`
pub fn can_delete(task: &TaskAccess<'_>, actor: &AuthContext) -> bool {
    task.created_by == actor.user_id || actor.permissions.tasks.delete
}

/// Moves `state` to `target`
///
/// Returns `Ok(false)` when `target` is the current status (nothing
/// changes), `Ok(true)` after a legal move.
pub fn transition(
    state: &mut TaskWrite,
    target: TaskStatus,
    now: DateTime<Utc>,
) -> Result<bool, LifecycleError> {
    if state.status == target {
        return Ok(false);
    }

    if !state.status.can_transition_to(target) {
        return Err(LifecycleError::IllegalTransition {
            from: state.status,
            to: target,
        });
    }

    state.completed_at = match target {
        TaskStatus::Completed => Some(now),
        _ => None,
    };
    state.status = target;

    Ok(true)
}
