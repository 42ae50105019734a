//! Task store operations
//!
//! Every function takes the caller's [`AuthContext`] and applies, in order:
//! input validation, visibility (invisible tasks are reported as not
//! found), modification rights, then the write. Mutations of an existing
//! task lock its row, write the new state and append one history record in
//! a single transaction. Reads made while the row is locked go through that
//! transaction's connection.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use sqlx::{postgres::PgExecutor, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::canonical::{canonical_priority, parse_priority, parse_status, PriorityPolicy};
use super::due_date::{format_due_date, parse_due_date};
use super::lifecycle::{can_delete, can_modify, transition};
use super::visibility::{filter_visible, is_visible, TaskAccess};
use crate::auth::authorization::require;
use crate::auth::middleware::AuthContext;
use crate::error::StoreError;
use crate::models::{
    assignment::TaskAssignment,
    organization::{Organization, OrganizationSettings},
    task::{NewTask, Task, TaskPriority, TaskQuery, TaskStatus, TaskWrite},
    task_history::{HistoryAction, TaskHistory},
    user::User,
};

/// Deployment-wide parsing rules for task input
#[derive(Debug, Clone, Copy)]
pub struct TaskRules {
    pub priority_policy: PriorityPolicy,

    /// Offset applied to due dates entered without one
    pub due_date_offset: FixedOffset,
}

impl Default for TaskRules {
    fn default() -> Self {
        Self {
            priority_policy: PriorityPolicy::Lenient,
            due_date_offset: Utc.fix(),
        }
    }
}

/// Task as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,

    /// RFC 3339 with the offset the date was entered in
    pub due_date: Option<String>,

    pub is_private: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: i32,
    pub assignees: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    pub fn new(task: Task, assignees: Vec<Uuid>) -> Self {
        Self {
            due_date: task.due_local().as_ref().map(format_due_date),
            id: task.id,
            organization_id: task.organization_id,
            created_by: task.created_by,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            is_private: task.is_private,
            completed_at: task.completed_at,
            version: task.version,
            assignees,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Input for [`create_task`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTaskInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub assignees: Option<Vec<Uuid>>,
}

/// Distinguishes an absent field from an explicit `null`
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update for [`update_task`]
///
/// For `description` and `due_date`, an absent field leaves the value alone
/// and `null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
    #[serde(default)]
    pub is_private: Option<bool>,

    /// Expected current version; a mismatch is a conflict
    #[serde(default)]
    pub version: Option<i32>,
}

/// Query-string filters for [`list_tasks`]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub from: Option<DateTime<FixedOffset>>,
    pub to: Option<DateTime<FixedOffset>>,
}

fn clean_title(title: &str) -> Result<String, StoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StoreError::validation("Title is required"));
    }
    if title.chars().count() > 200 {
        return Err(StoreError::validation("Title must be at most 200 characters"));
    }
    Ok(title.to_string())
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

fn unique_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

async fn organization_settings<'e>(
    executor: impl PgExecutor<'e>,
    organization_id: Uuid,
) -> Result<OrganizationSettings, StoreError> {
    Ok(Organization::find_by_id(executor, organization_id)
        .await?
        .map(|org| org.settings.0)
        .unwrap_or_default())
}

async fn check_assignees<'e>(
    executor: impl PgExecutor<'e>,
    organization_id: Uuid,
    user_ids: &[Uuid],
) -> Result<(), StoreError> {
    if user_ids.is_empty() {
        return Ok(());
    }

    let found = User::count_active_in_organization(executor, organization_id, user_ids).await?;
    if found != user_ids.len() as i64 {
        return Err(StoreError::validation(
            "Assignees must be active users of the task's organization",
        ));
    }

    Ok(())
}

/// Loads a task with its assignees, or `NotFound` if missing or invisible
async fn load_visible(
    pool: &PgPool,
    viewer: &AuthContext,
    id: Uuid,
) -> Result<(Task, Vec<Uuid>), StoreError> {
    let task = Task::find_by_id(pool, id)
        .await?
        .ok_or(StoreError::NotFound("Task"))?;
    let assignees = TaskAssignment::assignees(pool, id).await?;

    if !is_visible(&TaskAccess::of(&task, &assignees), viewer) {
        return Err(StoreError::NotFound("Task"));
    }

    Ok((task, assignees))
}

/// Creates a task in the caller's active organization
///
/// # Errors
///
/// - `Validation` for an empty title, unparseable due date, unknown
///   priority under the strict policy, a private task when the organization
///   disallows them, or assignees outside the organization
/// - `Forbidden` without `tasks.create`
pub async fn create_task(
    pool: &PgPool,
    rules: &TaskRules,
    viewer: &AuthContext,
    input: CreateTaskInput,
) -> Result<TaskView, StoreError> {
    require(viewer.permissions.tasks.create)?;

    let title = clean_title(&input.title)?;
    let priority = canonical_priority(input.priority.as_deref(), rules.priority_policy)
        .map_err(StoreError::Validation)?;
    let due_at = input
        .due_date
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(|d| parse_due_date(d, rules.due_date_offset))
        .transpose()
        .map_err(|e| StoreError::Validation(e.to_string()))?;

    let settings = organization_settings(pool, viewer.organization_id).await?;
    if input.is_private && !settings.allow_private_tasks {
        return Err(StoreError::validation(
            "Private tasks are disabled for this organization",
        ));
    }

    let assignees = unique_ids(input.assignees.as_deref().unwrap_or_default());
    check_assignees(pool, viewer.organization_id, &assignees).await?;

    let mut tx = pool.begin().await?;

    let task = Task::create(
        &mut *tx,
        NewTask {
            organization_id: viewer.organization_id,
            created_by: viewer.user_id,
            title,
            description: clean_description(input.description),
            priority,
            due_at,
            is_private: input.is_private,
        },
    )
    .await?;

    TaskAssignment::replace_all(&mut tx, task.id, &assignees).await?;

    tx.commit().await?;

    info!(task_id = %task.id, user_id = %viewer.user_id, "Task created");

    Ok(TaskView::new(task, assignees))
}

pub async fn get_task(pool: &PgPool, viewer: &AuthContext, id: Uuid) -> Result<TaskView, StoreError> {
    let (task, assignees) = load_visible(pool, viewer, id).await?;
    Ok(TaskView::new(task, assignees))
}

/// Tasks visible to the caller matching `filter`
///
/// Non-super-tenant callers see their active organization plus anything
/// they created or were assigned to elsewhere.
pub async fn list_tasks(
    pool: &PgPool,
    viewer: &AuthContext,
    filter: TaskFilter,
) -> Result<Vec<TaskView>, StoreError> {
    let status = filter
        .status
        .as_deref()
        .map(|s| parse_status(s).ok_or_else(|| StoreError::Validation(format!("Unknown status: {}", s))))
        .transpose()?;
    let priority = filter
        .priority
        .as_deref()
        .map(|p| parse_priority(p).ok_or_else(|| StoreError::Validation(format!("Unknown priority: {}", p))))
        .transpose()?;

    let query = TaskQuery {
        organization_id: (!viewer.role.is_super_tenant()).then_some(viewer.organization_id),
        viewer_id: viewer.user_id,
        status,
        priority,
        assigned_to: filter.assigned_to,
        due_from: filter.from.map(|d| d.with_timezone(&Utc)),
        due_to: filter.to.map(|d| d.with_timezone(&Utc)),
    };

    let tasks = Task::search(pool, &query).await?;
    let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
    let mut assignees = TaskAssignment::assignees_for(pool, &ids).await?;

    let views: Vec<TaskView> = tasks
        .into_iter()
        .map(|task| {
            let assigned = assignees.remove(&task.id).unwrap_or_default();
            TaskView::new(task, assigned)
        })
        .collect();

    let visible = filter_visible(views, viewer, |view| TaskAccess {
        organization_id: view.organization_id,
        created_by: view.created_by,
        is_private: view.is_private,
        assignees: &view.assignees,
    });

    debug!(user_id = %viewer.user_id, count = visible.len(), "Listed tasks");

    Ok(visible)
}

/// Applies a partial update, including any status transition
///
/// A patch that changes nothing returns the task untouched and records no
/// history.
///
/// # Errors
///
/// - `NotFound` if the task is missing or invisible
/// - `Forbidden` if the caller is not creator/assignee and lacks
///   `tasks.edit`, or changes the due date when neither the organization
///   toggle nor `tasks.edit_due_date` allows it
/// - `Conflict` when `version` does not match
/// - `Validation` for illegal transitions and malformed fields
pub async fn update_task(
    pool: &PgPool,
    rules: &TaskRules,
    viewer: &AuthContext,
    id: Uuid,
    patch: TaskPatch,
) -> Result<TaskView, StoreError> {
    let target_status = patch
        .status
        .as_deref()
        .map(|s| parse_status(s).ok_or_else(|| StoreError::Validation(format!("Unknown status: {}", s))))
        .transpose()?;
    let title = patch.title.as_deref().map(clean_title).transpose()?;
    let priority = patch
        .priority
        .as_deref()
        .map(|p| canonical_priority(Some(p), rules.priority_policy).map_err(StoreError::Validation))
        .transpose()?;
    let due_at = patch
        .due_date
        .map(|due| {
            due.filter(|d| !d.trim().is_empty())
                .map(|d| parse_due_date(&d, rules.due_date_offset))
                .transpose()
        })
        .transpose()
        .map_err(|e| StoreError::Validation(e.to_string()))?;

    let mut tx = pool.begin().await?;

    let current = Task::find_for_update(&mut *tx, id)
        .await?
        .ok_or(StoreError::NotFound("Task"))?;
    let assignees = TaskAssignment::assignees(&mut *tx, id).await?;
    let access = TaskAccess::of(&current, &assignees);

    if !is_visible(&access, viewer) {
        return Err(StoreError::NotFound("Task"));
    }
    require(can_modify(&access, viewer))?;

    if let Some(expected) = patch.version {
        if expected != current.version {
            return Err(StoreError::Conflict(
                "Task was modified by someone else; reload and try again".to_string(),
            ));
        }
    }

    let before = TaskWrite::from(&current);
    let mut next = before.clone();

    if let Some(title) = title {
        next.title = title;
    }
    if let Some(description) = patch.description {
        next.description = clean_description(description);
    }
    if let Some(priority) = priority {
        next.priority = priority;
    }

    let settings = organization_settings(&mut *tx, current.organization_id).await?;

    if let Some(due_at) = due_at {
        let changed = due_at.map(|d| d.timestamp()) != before.due_at.map(|d| d.timestamp());
        if changed && !(settings.can_edit_due_dates || viewer.permissions.tasks.edit_due_date) {
            return Err(StoreError::Forbidden);
        }
        next.due_at = due_at;
    }

    if let Some(is_private) = patch.is_private {
        if is_private && !before.is_private && !settings.allow_private_tasks {
            return Err(StoreError::validation(
                "Private tasks are disabled for this organization",
            ));
        }
        next.is_private = is_private;
    }

    let status_changed = match target_status {
        Some(target) => transition(&mut next, target, Utc::now())
            .map_err(|e| StoreError::Validation(e.to_string()))?,
        None => false,
    };

    if next == before {
        return Ok(TaskView::new(current, assignees));
    }

    let updated = Task::write(&mut *tx, id, next).await?;

    let action = if status_changed {
        HistoryAction::StatusChanged
    } else {
        HistoryAction::Updated
    };
    TaskHistory::record(
        &mut *tx,
        id,
        viewer.user_id,
        action,
        snapshot(&current),
        snapshot(&updated),
    )
    .await?;

    tx.commit().await?;

    info!(task_id = %id, user_id = %viewer.user_id, action = action.as_str(), "Task updated");

    Ok(TaskView::new(updated, assignees))
}

/// Moves a task to `status`; shorthand for a status-only patch
pub async fn transition_task(
    pool: &PgPool,
    rules: &TaskRules,
    viewer: &AuthContext,
    id: Uuid,
    status: TaskStatus,
) -> Result<TaskView, StoreError> {
    let patch = TaskPatch {
        status: Some(status.as_str().to_string()),
        ..Default::default()
    };
    update_task(pool, rules, viewer, id, patch).await
}

/// Replaces the assignee set of a task
pub async fn assign_task(
    pool: &PgPool,
    viewer: &AuthContext,
    id: Uuid,
    user_ids: &[Uuid],
) -> Result<TaskView, StoreError> {
    let user_ids = unique_ids(user_ids);

    let mut tx = pool.begin().await?;

    let task = Task::find_for_update(&mut *tx, id)
        .await?
        .ok_or(StoreError::NotFound("Task"))?;
    let before = TaskAssignment::assignees(&mut *tx, id).await?;
    let access = TaskAccess::of(&task, &before);

    if !is_visible(&access, viewer) {
        return Err(StoreError::NotFound("Task"));
    }
    require(can_modify(&access, viewer))?;

    check_assignees(&mut *tx, task.organization_id, &user_ids).await?;

    TaskAssignment::replace_all(&mut tx, id, &user_ids).await?;
    let after = TaskAssignment::assignees(&mut *tx, id).await?;

    TaskHistory::record(
        &mut *tx,
        id,
        viewer.user_id,
        HistoryAction::Assigned,
        json!({ "assignees": before }),
        json!({ "assignees": after }),
    )
    .await?;

    tx.commit().await?;

    info!(task_id = %id, user_id = %viewer.user_id, assignees = after.len(), "Task reassigned");

    Ok(TaskView::new(task, after))
}

/// Deletes a task, clearing its assignments first
pub async fn delete_task(pool: &PgPool, viewer: &AuthContext, id: Uuid) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;

    let task = Task::find_for_update(&mut *tx, id)
        .await?
        .ok_or(StoreError::NotFound("Task"))?;
    let assignees = TaskAssignment::assignees(&mut *tx, id).await?;
    let access = TaskAccess::of(&task, &assignees);

    if !is_visible(&access, viewer) {
        return Err(StoreError::NotFound("Task"));
    }
    require(can_delete(&access, viewer))?;

    TaskAssignment::delete_for_task(&mut *tx, id).await?;
    Task::delete(&mut *tx, id).await?;

    tx.commit().await?;

    info!(task_id = %id, user_id = %viewer.user_id, "Task deleted");

    Ok(())
}

/// Edit history of a visible task, oldest first
pub async fn task_history(
    pool: &PgPool,
    viewer: &AuthContext,
    id: Uuid,
) -> Result<Vec<TaskHistory>, StoreError> {
    load_visible(pool, viewer, id).await?;
    Ok(TaskHistory::list_for_task(pool, id).await?)
}

fn snapshot(task: &Task) -> serde_json::Value {
    json!({
        "title": task.title,
        "description": task.description,
        "status": task.status,
        "priority": task.priority,
        "due_date": task.due_local().as_ref().map(format_due_date),
        "is_private": task.is_private,
        "completed_at": task.completed_at,
        "version": task.version,
    })
}
