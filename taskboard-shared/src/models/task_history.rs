/// Task edit history
///
/// Append-only: one row per update, status transition or reassignment, with
/// JSON snapshots of the task before and after. `changed_by` has no foreign
/// key so history survives when the actor is purged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{postgres::PgExecutor, types::Json, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Updated,
    StatusChanged,
    Assigned,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Updated => "updated",
            HistoryAction::StatusChanged => "status_changed",
            HistoryAction::Assigned => "assigned",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskHistory {
    pub id: Uuid,
    pub task_id: Uuid,
    pub changed_by: Uuid,
    pub action: String,
    pub before_state: Option<Json<JsonValue>>,
    pub after_state: Option<Json<JsonValue>>,
    pub created_at: DateTime<Utc>,
}

impl TaskHistory {
    pub async fn record<'e>(
        executor: impl PgExecutor<'e>,
        task_id: Uuid,
        changed_by: Uuid,
        action: HistoryAction,
        before: JsonValue,
        after: JsonValue,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, TaskHistory>(
            r#"
            INSERT INTO task_history (task_id, changed_by, action, before_state, after_state)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, task_id, changed_by, action, before_state, after_state, created_at
            "#,
        )
        .bind(task_id)
        .bind(changed_by)
        .bind(action.as_str())
        .bind(Json(before))
        .bind(Json(after))
        .fetch_one(executor)
        .await
    }

    /// Oldest first
    pub async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskHistory>(
            r#"
            SELECT id, task_id, changed_by, action, before_state, after_state, created_at
            FROM task_history
            WHERE task_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_match_serde() {
        for action in [
            HistoryAction::Updated,
            HistoryAction::StatusChanged,
            HistoryAction::Assigned,
        ] {
            assert_eq!(serde_json::to_value(action).unwrap(), action.as_str());
        }
    }
}
