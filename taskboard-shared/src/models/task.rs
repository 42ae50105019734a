/// Task model and database operations
///
/// A task belongs to one organization and has exactly one creator. Status
/// follows a small state machine (see [`TaskStatus::can_transition_to`]) and
/// `completed_at` is set exactly while the status is `completed`; the table
/// enforces that pairing with a CHECK constraint.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('pending', 'in_progress', 'completed', 'cancelled');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'urgent');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id),
///     created_by UUID NOT NULL,
///     title TEXT NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'pending',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     due_at TIMESTAMPTZ,
///     due_offset_seconds INTEGER,
///     is_private BOOLEAN NOT NULL DEFAULT FALSE,
///     completed_at TIMESTAMPTZ,
///     version INTEGER NOT NULL DEFAULT 1,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// `due_at` is the instant; `due_offset_seconds` remembers the UTC offset
/// the due date was entered in so it can be rendered back as the same
/// wall-clock time.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::task::{NewTask, Task, TaskPriority};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, org_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, NewTask {
///     organization_id: org_id,
///     created_by: user_id,
///     title: "Grade midterms".to_string(),
///     description: None,
///     priority: TaskPriority::Urgent,
///     due_at: None,
///     is_private: false,
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Legal status moves
    ///
    /// `cancelled` is terminal. A completed task may be reopened back to
    /// `pending` or `in_progress`.
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        matches!(
            (self, target),
            (TaskStatus::Pending, TaskStatus::InProgress)
                | (TaskStatus::Pending, TaskStatus::Cancelled)
                | (TaskStatus::InProgress, TaskStatus::Completed)
                | (TaskStatus::InProgress, TaskStatus::Cancelled)
                | (TaskStatus::Completed, TaskStatus::Pending)
                | (TaskStatus::Completed, TaskStatus::InProgress)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub organization_id: Uuid,

    /// May reference a purged user
    pub created_by: Uuid,

    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_at: Option<DateTime<Utc>>,
    pub due_offset_seconds: Option<i32>,
    pub is_private: bool,
    pub completed_at: Option<DateTime<Utc>>,

    /// Incremented on every write
    pub version: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Due date in the offset it was entered in
    pub fn due_local(&self) -> Option<DateTime<FixedOffset>> {
        let due_at = self.due_at?;
        let offset = FixedOffset::east_opt(self.due_offset_seconds.unwrap_or(0))?;
        Some(due_at.with_timezone(&offset))
    }
}

/// Validated input for [`Task::create`]
#[derive(Debug, Clone)]
pub struct NewTask {
    pub organization_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub due_at: Option<DateTime<FixedOffset>>,
    pub is_private: bool,
}

/// Full mutable state written back by [`Task::write`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskWrite {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_at: Option<DateTime<FixedOffset>>,
    pub is_private: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Task> for TaskWrite {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            due_at: task.due_local(),
            is_private: task.is_private,
            completed_at: task.completed_at,
        }
    }
}

/// SQL-side narrowing for task listings
///
/// The visibility rules are applied afterwards in Rust; this only keeps the
/// candidate set small.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    /// Restrict to this organization, plus anything the viewer created or is
    /// assigned to. `None` searches every organization.
    pub organization_id: Option<Uuid>,
    pub viewer_id: Uuid,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
}

fn split_due(due_at: Option<DateTime<FixedOffset>>) -> (Option<DateTime<Utc>>, Option<i32>) {
    match due_at {
        Some(due) => (
            Some(due.with_timezone(&Utc)),
            Some(due.offset().local_minus_utc()),
        ),
        None => (None, None),
    }
}

impl Task {
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        data: NewTask,
    ) -> Result<Self, sqlx::Error> {
        let (due_at, due_offset) = split_due(data.due_at);

        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (organization_id, created_by, title, description, priority,
                               due_at, due_offset_seconds, is_private)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, organization_id, created_by, title, description, status, priority,
                      due_at, due_offset_seconds, is_private, completed_at, version,
                      created_at, updated_at
            "#,
        )
        .bind(data.organization_id)
        .bind(data.created_by)
        .bind(data.title)
        .bind(data.description)
        .bind(data.priority)
        .bind(due_at)
        .bind(due_offset)
        .bind(data.is_private)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, organization_id, created_by, title, description, status, priority,
                   due_at, due_offset_seconds, is_private, completed_at, version,
                   created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Same as [`Task::find_by_id`] but row-locks until the transaction ends
    pub async fn find_for_update<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, organization_id, created_by, title, description, status, priority,
                   due_at, due_offset_seconds, is_private, completed_at, version,
                   created_at, updated_at
            FROM tasks
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Candidate tasks for a listing, newest due date last
    pub async fn search(pool: &PgPool, query: &TaskQuery) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.organization_id, t.created_by, t.title, t.description, t.status,
                   t.priority, t.due_at, t.due_offset_seconds, t.is_private, t.completed_at,
                   t.version, t.created_at, t.updated_at
            FROM tasks t
            WHERE ($1::uuid IS NULL
                   OR t.organization_id = $1
                   OR t.created_by = $2
                   OR EXISTS (SELECT 1 FROM task_assignments a
                              WHERE a.task_id = t.id AND a.user_id = $2))
              AND ($3::task_status IS NULL OR t.status = $3)
              AND ($4::task_priority IS NULL OR t.priority = $4)
              AND ($5::uuid IS NULL OR EXISTS (SELECT 1 FROM task_assignments a
                                               WHERE a.task_id = t.id AND a.user_id = $5))
              AND ($6::timestamptz IS NULL OR t.due_at >= $6)
              AND ($7::timestamptz IS NULL OR t.due_at <= $7)
            ORDER BY t.due_at ASC NULLS LAST, t.created_at DESC
            "#,
        )
        .bind(query.organization_id)
        .bind(query.viewer_id)
        .bind(query.status)
        .bind(query.priority)
        .bind(query.assigned_to)
        .bind(query.due_from)
        .bind(query.due_to)
        .fetch_all(pool)
        .await
    }

    /// Writes the full mutable state and bumps `version`
    pub async fn write<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        data: TaskWrite,
    ) -> Result<Self, sqlx::Error> {
        let (due_at, due_offset) = split_due(data.due_at);

        sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, status = $4, priority = $5, due_at = $6,
                due_offset_seconds = $7, is_private = $8, completed_at = $9,
                version = version + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING id, organization_id, created_by, title, description, status, priority,
                      due_at, due_offset_seconds, is_private, completed_at, version,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(due_at)
        .bind(due_offset)
        .bind(data.is_private)
        .bind(data.completed_at)
        .fetch_one(executor)
        .await
    }

    pub async fn delete<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_transitions() {
        use TaskStatus::*;

        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(Completed.can_transition_to(Pending));
        assert!(Completed.can_transition_to(InProgress));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        for target in TaskStatus::ALL {
            assert!(!Cancelled.can_transition_to(target));
        }
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_value(TaskStatus::InProgress).unwrap(), "in_progress");
        assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
        assert_eq!(serde_json::to_value(TaskPriority::Urgent).unwrap(), "urgent");
    }

    #[test]
    fn test_split_due_keeps_offset() {
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let due = offset.with_ymd_and_hms(2025, 3, 14, 18, 30, 0).unwrap();

        let (utc, secs) = split_due(Some(due));
        assert_eq!(utc.unwrap(), Utc.with_ymd_and_hms(2025, 3, 14, 21, 30, 0).unwrap());
        assert_eq!(secs, Some(-3 * 3600));
        assert_eq!(split_due(None), (None, None));
    }

    #[test]
    fn test_due_local_restores_wall_clock() {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            title: "t".to_string(),
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            due_at: Some(Utc.with_ymd_and_hms(2025, 3, 14, 21, 30, 0).unwrap()),
            due_offset_seconds: Some(-3 * 3600),
            is_private: false,
            completed_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(
            task.due_local().unwrap().to_rfc3339(),
            "2025-03-14T18:30:00-03:00"
        );
    }
}
